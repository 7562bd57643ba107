use std::fs;
use std::path::Path;

use goblin::elf::{self, Elf};
use goblin::pe::{self, PE};
use goblin::Object;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult};
use crate::image::xrefs::{RelocationRecord, XrefIndex};
use crate::image::{ImageAccessor, MemoryImage, MemoryImageBuilder, RelocationProvider};
use crate::model::{AddressRange, RelocationSet, SegmentPermissions};

/// Container format of a loaded binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryFormat {
    Elf,
    Pe,
}

impl BinaryFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryFormat::Elf => "ELF",
            BinaryFormat::Pe => "PE",
        }
    }
}

/// A binary mapped into memory together with its relocation metadata.
#[derive(Debug, Clone)]
pub struct LoadedBinary {
    pub format: BinaryFormat,
    /// Normalized machine name (`x86_64`, `arm64`, ...), when recognized.
    pub machine: Option<String>,
    pub image: MemoryImage,
    pub relocations: RelocationSet,
}

impl RelocationProvider for LoadedBinary {
    fn relocated_addresses(&self) -> &RelocationSet {
        &self.relocations
    }
}

/// Read and map the binary at `path`.
pub fn load_binary_file(path: &Path, config: &ScanConfig) -> ScanResult<LoadedBinary> {
    let bytes = fs::read(path).map_err(|_| ScanError::MissingBinary(path.to_path_buf()))?;
    load_binary(&bytes, config)
}

/// Map an ELF64 or PE32+ image from raw file bytes.
///
/// Anything else (32-bit images, Mach-O, archives) is rejected with
/// [`ScanError::UnsupportedTarget`] before scanning starts.
pub fn load_binary(bytes: &[u8], config: &ScanConfig) -> ScanResult<LoadedBinary> {
    match Object::parse(bytes)? {
        Object::Elf(elf) => load_elf(&elf, bytes, config),
        Object::PE(pe) => load_pe(&pe, bytes, config),
        Object::Mach(_) => {
            Err(ScanError::UnsupportedTarget("Mach-O images are not supported".into()))
        }
        Object::Archive(_) => {
            Err(ScanError::UnsupportedTarget("static archives are not supported".into()))
        }
        _ => Err(ScanError::UnsupportedTarget("unrecognized binary format".into())),
    }
}

fn elf_machine(machine: u16) -> Option<String> {
    match machine {
        elf::header::EM_X86_64 => Some("x86_64".into()),
        elf::header::EM_AARCH64 => Some("arm64".into()),
        elf::header::EM_RISCV => Some("riscv64".into()),
        elf::header::EM_PPC64 => Some("ppc64".into()),
        _ => None,
    }
}

fn pe_machine(machine: u16) -> Option<String> {
    match machine {
        pe::header::COFF_MACHINE_X86_64 => Some("x86_64".into()),
        pe::header::COFF_MACHINE_ARM64 => Some("arm64".into()),
        _ => None,
    }
}

fn load_elf(elf: &Elf, bytes: &[u8], config: &ScanConfig) -> ScanResult<LoadedBinary> {
    if !elf.is_64 {
        return Err(ScanError::UnsupportedTarget(
            "only 64-bit ELF images are supported".into(),
        ));
    }
    if !elf.little_endian {
        return Err(ScanError::UnsupportedTarget(
            "only little-endian ELF images are supported".into(),
        ));
    }

    let image_base = elf
        .program_headers
        .iter()
        .filter(|ph| ph.p_type == elf::program_header::PT_LOAD)
        .map(|ph| ph.p_vaddr & !0xFFF)
        .min()
        .unwrap_or(0);

    let mut builder = MemoryImage::builder().image_base(image_base);
    let alloc = u64::from(elf::section_header::SHF_ALLOC);
    let write = u64::from(elf::section_header::SHF_WRITE);
    let exec = u64::from(elf::section_header::SHF_EXECINSTR);

    for sh in &elf.section_headers {
        if sh.sh_flags & alloc == 0 || sh.sh_addr == 0 {
            continue;
        }
        let name = elf.shdr_strtab.get_at(sh.sh_name).unwrap_or("").to_string();
        let permissions = SegmentPermissions {
            read: true,
            write: sh.sh_flags & write != 0,
            execute: sh.sh_flags & exec != 0,
        };

        if sh.sh_type == elf::section_header::SHT_NOBITS {
            builder = builder.uninitialized_segment(name, sh.sh_addr, sh.sh_size, permissions);
            continue;
        }

        let data = file_slice(bytes, sh.sh_offset, sh.sh_size);
        builder = builder.segment(name, sh.sh_addr, sh.sh_size, permissions, data);
    }

    let records = elf_relocations(elf, config);
    let relocations: RelocationSet = records.iter().map(|r| r.offset).collect();
    let machine = elf_machine(elf.header.e_machine);

    let image = finish_image(builder, &records, config, machine.as_deref());
    info!(
        "Loaded ELF image: {} segments, {} relocated addresses",
        image.segments().len(),
        relocations.len()
    );

    Ok(LoadedBinary { format: BinaryFormat::Elf, machine, image, relocations })
}

/// Collect relocation records from the configured relocation sections,
/// falling back to the dynamic tables when none of them exist.
fn elf_relocations(elf: &Elf, config: &ScanConfig) -> Vec<RelocationRecord> {
    let mut records = Vec::new();
    let mut found_section = false;

    for (shdr_idx, section) in &elf.shdr_relocs {
        let Some(sh) = elf.section_headers.get(*shdr_idx) else { continue };
        let name = elf.shdr_strtab.get_at(sh.sh_name).unwrap_or("");
        if !config.sections.relocations.iter().any(|r| r == name) {
            continue;
        }
        found_section = true;
        records.extend(
            section
                .iter()
                .map(|reloc| RelocationRecord { offset: reloc.r_offset, addend: reloc.r_addend }),
        );
    }

    if !found_section {
        debug!("no configured relocation sections found; using dynamic relocation tables");
        for table in [&elf.dynrelas, &elf.dynrels, &elf.pltrelocs] {
            records.extend(
                table
                    .iter()
                    .map(|reloc| RelocationRecord { offset: reloc.r_offset, addend: reloc.r_addend }),
            );
        }
    }

    if records.is_empty() {
        warn!("ELF image has no relocation entries; relocation heuristics are inactive");
    }
    records
}

fn load_pe(pe: &PE, bytes: &[u8], config: &ScanConfig) -> ScanResult<LoadedBinary> {
    if !pe.is_64 {
        return Err(ScanError::UnsupportedTarget("only PE32+ images are supported".into()));
    }

    let image_base = pe.image_base as u64;
    let mut builder = MemoryImage::builder().image_base(image_base);

    let size_of_image = pe
        .header
        .optional_header
        .as_ref()
        .map(|oh| u64::from(oh.windows_fields.size_of_image));

    for sec in &pe.sections {
        let name = sec.name().unwrap_or_default().to_string();
        let declared = if sec.virtual_size == 0 {
            u64::from(sec.size_of_raw_data)
        } else {
            u64::from(sec.virtual_size)
        };
        // A section cannot extend past the end of the image.
        let virtual_size = match size_of_image {
            Some(limit) => declared.min(limit.saturating_sub(u64::from(sec.virtual_address))),
            None => declared,
        };
        if virtual_size < declared {
            warn!(
                "PE section {name} declares 0x{declared:x} bytes; clamped to 0x{virtual_size:x}"
            );
        }
        let raw_size = u64::from(sec.size_of_raw_data).min(virtual_size);
        // The tail past the raw data reads as zero; it is not materialised.
        let data = file_slice(bytes, u64::from(sec.pointer_to_raw_data), raw_size);

        let characteristics = sec.characteristics;
        let permissions = SegmentPermissions {
            read: characteristics & pe::section_table::IMAGE_SCN_MEM_READ != 0,
            write: characteristics & pe::section_table::IMAGE_SCN_MEM_WRITE != 0,
            execute: characteristics & pe::section_table::IMAGE_SCN_MEM_EXECUTE != 0,
        };

        let start = image_base.saturating_add(u64::from(sec.virtual_address));
        builder = builder.segment(name, start, virtual_size, permissions, data);
    }

    let machine = pe_machine(pe.header.coff_header.machine);
    let image = finish_image(builder, &[], config, machine.as_deref());
    info!(
        "Loaded PE image at base 0x{image_base:x}: {} segments",
        image.segments().len()
    );

    Ok(LoadedBinary {
        format: BinaryFormat::Pe,
        machine,
        image,
        relocations: RelocationSet::new(),
    })
}

/// Build the image and attach cross-reference counts for vtable sections.
fn finish_image(
    builder: MemoryImageBuilder,
    relocations: &[RelocationRecord],
    config: &ScanConfig,
    machine: Option<&str>,
) -> MemoryImage {
    let mut image = builder.build();
    let targets: Vec<AddressRange> = image
        .segments()
        .iter()
        .filter(|s| config.is_vtable_section(&s.name))
        .map(|s| s.range())
        .collect();
    let rip_relative = machine == Some("x86_64");
    let index = XrefIndex::build(&image, relocations, &targets, rip_relative);
    image.set_xref_counts(index.into_counts());
    image
}

fn file_slice(bytes: &[u8], offset: u64, size: u64) -> Vec<u8> {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(bytes.len());
    let end = usize::try_from(offset.saturating_add(size)).unwrap_or(usize::MAX).min(bytes.len());
    bytes[start..end].to_vec()
}
