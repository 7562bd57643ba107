use log::debug;

use crate::image::ImageAccessor;
use crate::model::{OffsetToTopMap, VtableEntrySet, WORD_SIZE};

/// Drop overlapping candidates produced by the zero-slot lookahead.
///
/// For every candidate `v` (in ascending order, including ones already
/// removed) and every `k` in `1..=allowed_zero_entries`: if `v + 8k` is also
/// a candidate, the shifted one is removed when nothing references it;
/// otherwise `v` is removed when nothing references it. When both have
/// references both are kept.
///
/// Returns the removed addresses in removal order.
pub fn disambiguate(
    image: &dyn ImageAccessor,
    offsets: &mut OffsetToTopMap,
    entries: &mut VtableEntrySet,
    allowed_zero_entries: usize,
) -> Vec<u64> {
    let mut removed = Vec::new();
    let snapshot: Vec<u64> = offsets.keys().copied().collect();

    for base in snapshot {
        for step in 1..=allowed_zero_entries as u64 {
            let Some(shifted) = base.checked_add(step * WORD_SIZE) else { break };
            if !offsets.contains_key(&shifted) {
                continue;
            }

            if image.xref_count(shifted) == 0 {
                offsets.remove(&shifted);
                entries.remove(&shifted);
                debug!("dropped unreferenced candidate 0x{shifted:x} overlapping 0x{base:x}");
                removed.push(shifted);
                continue;
            }

            if image.xref_count(base) == 0 && offsets.remove(&base).is_some() {
                entries.remove(&base);
                debug!("dropped unreferenced candidate 0x{base:x} overlapping 0x{shifted:x}");
                removed.push(base);
            }
        }
    }

    removed
}
