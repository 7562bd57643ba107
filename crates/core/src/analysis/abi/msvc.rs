use crate::analysis::scanner::Window;
use crate::analysis::ScanContext;
use crate::image::ImageAccessor;
use crate::model::{Abi, PointerClassification, VtableHeader};

use super::VtableAbi;

/// Byte offset of the `offset` field inside an RTTI Complete Object Locator
/// (`signature`, `offset`, `cdOffset`, ...).
const COL_OFFSET_FIELD: u64 = 4;

/// Microsoft Visual C++ ABI: `[COL pointer][entry0][entry1]...`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsvcAbi;

impl VtableAbi for MsvcAbi {
    fn abi(&self) -> Abi {
        Abi::Msvc
    }

    fn header_words(&self) -> u64 {
        1
    }

    fn classify(&self, ctx: &ScanContext<'_>, _address: u64, value: u64) -> PointerClassification {
        if value == ctx.pure_virtual {
            PointerClassification::PureVirtualSentinel
        } else if ctx.in_text(value) {
            PointerClassification::CodePointer
        } else {
            PointerClassification::Invalid
        }
    }

    fn check_header(
        &self,
        ctx: &ScanContext<'_>,
        image: &dyn ImageAccessor,
        _position: u64,
        window: &Window,
    ) -> Option<VtableHeader> {
        let locator = window.previous?;
        if ctx.in_text(locator) || !ctx.in_vtable_section(locator) {
            return None;
        }

        let field = locator.checked_add(COL_OFFSET_FIELD)?;
        let offset = i64::from(image.read_u32(field).ok()?);
        if offset > ctx.offset_to_top_bound {
            return None;
        }

        // MSVC stores the magnitude; Itanium-style consumers expect it negated.
        Some(VtableHeader { offset_to_top: -offset, rtti: Some(locator) })
    }
}
