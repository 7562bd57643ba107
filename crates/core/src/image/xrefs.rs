use std::collections::HashMap;

use log::debug;

use crate::model::{AddressRange, WORD_SIZE};

use super::{ImageAccessor, MemoryImage};

/// A relocation record as far as cross-reference counting cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationRecord {
    pub offset: u64,
    pub addend: Option<i64>,
}

/// Incoming reference counts for addresses inside a set of target ranges.
///
/// Without a disassembler the index is assembled from three byte-level
/// sources:
/// - aligned 8-byte data words (outside executable segments) equal to a target,
/// - relocation addends equal to a target, when the stored word differs,
/// - RIP-relative 32-bit displacements in executable segments (x86-64 only).
#[derive(Debug, Clone, Default)]
pub struct XrefIndex {
    counts: HashMap<u64, usize>,
}

impl XrefIndex {
    pub fn build(
        image: &MemoryImage,
        relocations: &[RelocationRecord],
        targets: &[AddressRange],
        rip_relative: bool,
    ) -> Self {
        let mut index = XrefIndex::default();
        if targets.is_empty() {
            return index;
        }
        let is_target = |value: u64| targets.iter().any(|r| r.contains(value));

        for (segment, bytes) in image.segments_with_bytes() {
            let Some(bytes) = bytes else { continue };

            if segment.permissions.execute {
                if rip_relative {
                    index.sweep_rip_relative(segment.start, bytes, &is_target);
                }
                continue;
            }

            // Data words are only meaningful at their natural alignment.
            let skew = ((WORD_SIZE - segment.start % WORD_SIZE) % WORD_SIZE) as usize;
            for chunk in bytes.get(skew..).unwrap_or_default().chunks_exact(WORD_SIZE as usize) {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                let value = u64::from_le_bytes(word);
                if is_target(value) {
                    index.add(value);
                }
            }
        }

        for reloc in relocations {
            let Some(addend) = reloc.addend else { continue };
            let value = addend as u64;
            if !is_target(value) {
                continue;
            }
            // Already counted as a data word when the linker also stored it.
            let stored = image.read_u64(reloc.offset).ok();
            if stored != Some(value) {
                index.add(value);
            }
        }

        debug!("xref index covers {} distinct target addresses", index.counts.len());
        index
    }

    fn sweep_rip_relative(&mut self, base: u64, bytes: &[u8], is_target: &impl Fn(u64) -> bool) {
        for (offset, window) in bytes.windows(4).enumerate() {
            let disp = i32::from_le_bytes([window[0], window[1], window[2], window[3]]);
            // The displacement is relative to the end of the 4-byte field.
            let next = base.wrapping_add(offset as u64).wrapping_add(4);
            let target = next.wrapping_add(disp as i64 as u64);
            if is_target(target) {
                self.add(target);
            }
        }
    }

    fn add(&mut self, address: u64) {
        *self.counts.entry(address).or_insert(0) += 1;
    }

    pub fn count(&self, address: u64) -> usize {
        self.counts.get(&address).copied().unwrap_or(0)
    }

    pub fn into_counts(self) -> HashMap<u64, usize> {
        self.counts
    }
}
