use crate::image::ImageAccessor;
use crate::model::{OffsetToTopMap, VtableEntrySet, WORD_SIZE};

use super::abi::{for_abi, VtableAbi};
use super::ScanContext;

/// Collects the ordered dispatch slots of confirmed vtables.
pub struct EntryExtractor<'a> {
    image: &'a dyn ImageAccessor,
    ctx: &'a ScanContext<'a>,
    abi: &'static dyn VtableAbi,
}

impl<'a> EntryExtractor<'a> {
    pub fn new(image: &'a dyn ImageAccessor, ctx: &'a ScanContext<'a>) -> Self {
        Self { image, ctx, abi: for_abi(ctx.abi) }
    }

    /// Slots of the table starting at `address`, in ascending memory order.
    ///
    /// Walks forward while each word classifies as a dispatch slot. With zero
    /// tolerance enabled, a zero word is also accepted among the first
    /// `allowed_zero_entries` slots. Stops at the first rejected word or the
    /// end of the hosting section.
    pub fn extract(&self, address: u64) -> Vec<u64> {
        let mut entries = Vec::new();
        let Some(section) = self.ctx.hosting_section(address) else {
            return entries;
        };

        let mut slot = address;
        while slot.checked_add(WORD_SIZE).is_some_and(|next| next <= section.end) {
            let Ok(value) = self.image.read_u64(slot) else { break };

            let tolerated_zero = self.ctx.zero_tolerance
                && value == 0
                && entries.len() < self.ctx.allowed_zero_entries;
            if !tolerated_zero && !self.abi.classify(self.ctx, slot, value).is_valid() {
                break;
            }

            entries.push(value);
            slot += WORD_SIZE;
        }
        entries
    }

    /// Extract slots for every candidate key in `offsets`.
    pub fn extract_all(&self, offsets: &OffsetToTopMap) -> VtableEntrySet {
        offsets.keys().map(|&address| (address, self.extract(address))).collect()
    }
}
