use crate::analysis::scanner::Window;
use crate::analysis::ScanContext;
use crate::image::ImageAccessor;
use crate::model::{Abi, PointerClassification, VtableHeader, WORD_SIZE};

use super::VtableAbi;

/// Itanium C++ ABI (GCC / Clang): `[offset-to-top][RTTI][entry0]...`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItaniumAbi;

impl VtableAbi for ItaniumAbi {
    fn abi(&self) -> Abi {
        Abi::Itanium
    }

    fn header_words(&self) -> u64 {
        2
    }

    fn classify(&self, ctx: &ScanContext<'_>, address: u64, value: u64) -> PointerClassification {
        if value == ctx.pure_virtual {
            return PointerClassification::PureVirtualSentinel;
        }
        if ctx.text.contains(value) {
            return PointerClassification::CodePointer;
        }
        if ctx.extern_range.contains(value) {
            return PointerClassification::ExternPointer;
        }
        if ctx.in_plt(value) {
            return PointerClassification::PltPointer;
        }
        // A relocated slot is patched at load time, so its file value says
        // little. Relocated RTTI back-references point into a vtable
        // section though, and those are not dispatch entries.
        if ctx.relocations.contains(address)
            && !ctx.vtable_sections.iter().any(|s| s.range().contains_inclusive(value))
        {
            return PointerClassification::RelocatedNonVtablePointer;
        }
        PointerClassification::Invalid
    }

    fn check_header(
        &self,
        ctx: &ScanContext<'_>,
        image: &dyn ImageAccessor,
        position: u64,
        window: &Window,
    ) -> Option<VtableHeader> {
        let offset_word = window.previous_previous?;
        let rtti = window.previous?;

        let offset_to_top = offset_word as i64;
        let bound = ctx.offset_to_top_bound;
        if offset_to_top < -bound || offset_to_top > bound {
            return None;
        }

        let rtti_valid = rtti == 0 || (!ctx.in_text(rtti) && image.is_mapped(rtti));
        if !rtti_valid {
            return None;
        }

        // RTTI may legitimately be relocated; offset-to-top never is.
        let offset_address = position.checked_sub(2 * WORD_SIZE)?;
        if ctx.relocations.contains(offset_address) {
            return None;
        }

        Some(VtableHeader { offset_to_top, rtti: (rtti != 0).then_some(rtti) })
    }
}
