//! Access to the static memory image of a binary.
//!
//! The scanner never talks to a file format or a disassembler directly; it
//! only sees the [`ImageAccessor`] trait. This module provides:
//! - `ImageAccessor`: word reads, segment enumeration and xref counts.
//! - `RelocationProvider`: the set of load-time patched addresses.
//! - `MemoryImage`: an in-memory implementation (used by the loader and tests).
//! - `loader`: goblin-backed ELF / PE loading into a `MemoryImage`.
//! - `xrefs`: the cross-reference index that backs `xref_count`.

pub mod loader;
pub mod memory;
pub mod xrefs;

pub use loader::{load_binary, load_binary_file, BinaryFormat, LoadedBinary};
pub use memory::{MemoryImage, MemoryImageBuilder};
pub use xrefs::XrefIndex;

use crate::error::MemoryError;
use crate::model::{RelocationSet, Segment};

/// Read-only view of a loaded binary image.
pub trait ImageAccessor {
    /// Little-endian 64-bit read at `address`.
    fn read_u64(&self, address: u64) -> Result<u64, MemoryError>;

    /// Little-endian 32-bit read at `address`.
    fn read_u32(&self, address: u64) -> Result<u32, MemoryError>;

    /// All segments, in load order.
    fn segments(&self) -> &[Segment];

    /// Number of recorded incoming references to `address`.
    fn xref_count(&self, address: u64) -> usize;

    fn image_base(&self) -> u64;

    /// Whether some segment covers `address`.
    fn is_mapped(&self, address: u64) -> bool {
        self.segments().iter().any(|s| s.contains(address))
    }

    fn segment_by_name(&self, name: &str) -> Option<&Segment> {
        self.segments().iter().find(|s| s.name == name)
    }
}

/// Source of the addresses whose stored value is patched at load time.
pub trait RelocationProvider {
    fn relocated_addresses(&self) -> &RelocationSet;
}

impl RelocationProvider for RelocationSet {
    fn relocated_addresses(&self) -> &RelocationSet {
        self
    }
}
