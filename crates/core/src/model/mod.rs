//! Core data model for binary images and recovered vtables.
//!
//! This module contains:
//! - Segment / address-range representation of the loaded image
//! - The relocation set handed to a scan run
//! - Pointer classification results
//! - Vtable candidates and the per-address maps produced by the scanner

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Size in bytes of one vtable slot on the supported (64-bit) targets.
pub const WORD_SIZE: u64 = 8;

/// Half-open address range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddressRange {
    pub start: u64,
    pub end: u64,
}

impl AddressRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// An empty range never contains anything.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, address: u64) -> bool {
        self.start <= address && address < self.end
    }

    /// Like [`contains`](Self::contains), but also accepts `end` itself.
    pub fn contains_inclusive(&self, address: u64) -> bool {
        self.start <= address && address <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// Access permissions of a loaded segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SegmentPermissions {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl SegmentPermissions {
    pub const R: Self = Self { read: true, write: false, execute: false };
    pub const RW: Self = Self { read: true, write: true, execute: false };
    pub const RX: Self = Self { read: true, write: false, execute: true };
}

impl std::fmt::Display for SegmentPermissions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.read { 'r' } else { '-' },
            if self.write { 'w' } else { '-' },
            if self.execute { 'x' } else { '-' }
        )
    }
}

/// A named, contiguous region of the loaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub start: u64,
    pub end: u64,
    pub permissions: SegmentPermissions,
}

impl Segment {
    pub fn new(
        name: impl Into<String>,
        start: u64,
        end: u64,
        permissions: SegmentPermissions,
    ) -> Self {
        Self { name: name.into(), start, end, permissions }
    }

    pub fn range(&self) -> AddressRange {
        AddressRange::new(self.start, self.end)
    }

    pub fn contains(&self, address: u64) -> bool {
        self.range().contains(address)
    }

    pub fn size(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// Addresses whose stored value is patched by the loader at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationSet {
    addresses: HashSet<u64>,
}

impl RelocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: u64) -> bool {
        self.addresses.insert(address)
    }

    pub fn contains(&self, address: u64) -> bool {
        self.addresses.contains(&address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.addresses.iter().copied()
    }
}

impl FromIterator<u64> for RelocationSet {
    fn from_iter<T: IntoIterator<Item = u64>>(iter: T) -> Self {
        Self { addresses: iter.into_iter().collect() }
    }
}

impl Extend<u64> for RelocationSet {
    fn extend<T: IntoIterator<Item = u64>>(&mut self, iter: T) {
        self.addresses.extend(iter);
    }
}

/// Result of classifying a candidate vtable slot value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerClassification {
    CodePointer,
    ExternPointer,
    PltPointer,
    PureVirtualSentinel,
    RelocatedNonVtablePointer,
    Invalid,
}

impl PointerClassification {
    /// Whether the value may stand in a vtable dispatch slot.
    pub fn is_valid(self) -> bool {
        !matches!(self, PointerClassification::Invalid)
    }
}

/// Header words validated in front of a vtable's first dispatch slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VtableHeader {
    pub offset_to_top: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtti: Option<u64>,
}

/// Vtable address (first dispatch slot) → validated header.
pub type OffsetToTopMap = BTreeMap<u64, VtableHeader>;

/// Vtable address → raw slot values in ascending memory order.
pub type VtableEntrySet = BTreeMap<u64, Vec<u64>>;

/// A recovered vtable: header and dispatch entries merged by address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VtableCandidate {
    pub address: u64,
    pub offset_to_top: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtti: Option<u64>,
    pub entries: Vec<u64>,
}

impl VtableCandidate {
    /// Merge the scanner and extractor maps on their shared key.
    ///
    /// Addresses without entries are dropped; a candidate always has at
    /// least one slot.
    pub fn merge(offsets: &OffsetToTopMap, entries: &VtableEntrySet) -> Vec<VtableCandidate> {
        offsets
            .iter()
            .filter_map(|(&address, header)| {
                let slots = entries.get(&address)?;
                if slots.is_empty() {
                    return None;
                }
                Some(VtableCandidate {
                    address,
                    offset_to_top: header.offset_to_top,
                    rtti: header.rtti,
                    entries: slots.clone(),
                })
            })
            .collect()
    }
}

/// C++ ABI whose vtable layout the scanner assumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Abi {
    /// GCC / Clang on Linux-like targets (ELF).
    Itanium,
    /// Microsoft Visual C++ (PE).
    Msvc,
}

impl Abi {
    pub fn as_str(&self) -> &'static str {
        match self {
            Abi::Itanium => "itanium",
            Abi::Msvc => "msvc",
        }
    }
}

impl std::fmt::Display for Abi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Abi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "itanium" | "gcc" | "gcc64" | "linux" => Ok(Abi::Itanium),
            "msvc" | "msvc64" | "windows" => Ok(Abi::Msvc),
            other => Err(format!("unknown ABI '{other}' (expected itanium or msvc)")),
        }
    }
}
