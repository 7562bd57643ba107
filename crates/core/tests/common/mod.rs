#![allow(dead_code)]

use vtscan_core::config::ScanConfig;
use vtscan_core::image::{MemoryImage, MemoryImageBuilder};
use vtscan_core::model::{Abi, SegmentPermissions};

mod elf;
mod pe;

pub use elf::*;
pub use pe::*;

/// Pure-virtual handler used by fixtures; deliberately outside every segment.
pub const PURE_VIRTUAL: u64 = 0x9000;

pub const TEXT_START: u64 = 0x1000;
pub const TEXT_SIZE: u64 = 0x1000;

pub fn itanium_config() -> ScanConfig {
    ScanConfig::new(PURE_VIRTUAL).with_abi(Abi::Itanium)
}

pub fn msvc_config() -> ScanConfig {
    ScanConfig::new(PURE_VIRTUAL).with_abi(Abi::Msvc)
}

/// Builder with a zero-filled `.text` at `[0x1000, 0x2000)`.
pub fn with_text() -> MemoryImageBuilder {
    MemoryImage::builder().segment(
        ".text",
        TEXT_START,
        TEXT_SIZE,
        SegmentPermissions::RX,
        vec![0; TEXT_SIZE as usize],
    )
}

/// `.text` plus a `.rodata` segment at `start` holding `words`.
pub fn rodata_image(start: u64, words: &[u64]) -> MemoryImage {
    with_text().words(".rodata", start, SegmentPermissions::R, words).build()
}
