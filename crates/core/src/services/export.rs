//! Text exports consumed by downstream class-hierarchy tooling.
//!
//! Every file starts with the module name on its own line. The vtable file
//! then holds one record per table:
//!
//! ```text
//! <hex address> <signed decimal offset-to-top> <hex entry 0> ... <hex entry n>
//! ```
//!
//! Hex values are lowercase without a `0x` prefix.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::image::ImageAccessor;
use crate::model::{VtableCandidate, WORD_SIZE};
use crate::services::scan::ScanReport;

/// One 8-byte slot of the global offset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GotEntry {
    pub address: u64,
    pub value: u64,
}

/// Paths written by [`export_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub vtables: PathBuf,
    pub blacklist: PathBuf,
    pub got: Option<PathBuf>,
}

/// Single record line (without trailing newline).
pub fn format_vtable_record(vtable: &VtableCandidate) -> String {
    let mut line = format!("{:x} {}", vtable.address, vtable.offset_to_top);
    for entry in &vtable.entries {
        let _ = write!(line, " {entry:x}");
    }
    line
}

pub fn write_vtables<W: Write>(
    out: &mut W,
    module_name: &str,
    vtables: &[VtableCandidate],
) -> io::Result<()> {
    writeln!(out, "{module_name}")?;
    for vtable in vtables {
        writeln!(out, "{}", format_vtable_record(vtable))?;
    }
    Ok(())
}

/// Functions that must never be treated as real virtual targets.
pub fn write_blacklist<W: Write>(out: &mut W, module_name: &str, pure_virtual: u64) -> io::Result<()> {
    writeln!(out, "{module_name}")?;
    if pure_virtual != 0 {
        writeln!(out, "{pure_virtual:x}")?;
    }
    Ok(())
}

pub fn write_got<W: Write>(out: &mut W, module_name: &str, got: &[GotEntry]) -> io::Result<()> {
    writeln!(out, "{module_name}")?;
    for entry in got {
        writeln!(out, "{:x} {:x}", entry.address, entry.value)?;
    }
    Ok(())
}

/// Every readable 8-byte slot of the section named `got_name`.
pub fn got_entries(image: &dyn ImageAccessor, got_name: &str) -> Vec<GotEntry> {
    let Some(got) = image.segment_by_name(got_name) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    let mut address = got.start;
    while address.checked_add(WORD_SIZE).is_some_and(|next| next <= got.end) {
        match image.read_u64(address) {
            Ok(value) => entries.push(GotEntry { address, value }),
            Err(_) => break,
        }
        address += WORD_SIZE;
    }
    entries
}

/// Write the vtable, blacklist and (when present) GOT files for `report`
/// into `dir`, named `<module>_vtables.txt`, `<module>_funcs_blacklist.txt`
/// and `<module>_got.txt`.
pub fn export_all(report: &ScanReport, dir: &Path) -> io::Result<ExportedFiles> {
    fs::create_dir_all(dir)?;
    let module = &report.module_name;

    let vtables = dir.join(format!("{module}_vtables.txt"));
    let mut buf = Vec::new();
    write_vtables(&mut buf, module, &report.vtables)?;
    fs::write(&vtables, buf)?;

    let blacklist = dir.join(format!("{module}_funcs_blacklist.txt"));
    let mut buf = Vec::new();
    write_blacklist(&mut buf, module, report.pure_virtual)?;
    fs::write(&blacklist, buf)?;

    let got = if report.got.is_empty() {
        None
    } else {
        let path = dir.join(format!("{module}_got.txt"));
        let mut buf = Vec::new();
        write_got(&mut buf, module, &report.got)?;
        fs::write(&path, buf)?;
        Some(path)
    };

    Ok(ExportedFiles { vtables, blacklist, got })
}
