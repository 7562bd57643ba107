#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

#[path = "../../../core/tests/common/elf.rs"]
mod elf;

pub use elf::vtable_elf_fixture;

/// Pure-virtual handler address passed to every fixture scan.
pub const PURE_VIRTUAL: &str = "0x9000";

/// Write the ELF fixture (one Itanium vtable at 0x2010) as `name` inside
/// `dir`.
pub fn write_fixture(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, vtable_elf_fixture()).expect("write fixture");
    path
}
