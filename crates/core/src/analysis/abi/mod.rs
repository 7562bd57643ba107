//! ABI-specific pointer classification and vtable header checks.

mod itanium;
mod msvc;

pub use itanium::ItaniumAbi;
pub use msvc::MsvcAbi;

use crate::analysis::scanner::Window;
use crate::analysis::ScanContext;
use crate::image::ImageAccessor;
use crate::model::{Abi, PointerClassification, VtableHeader};

/// The parts of vtable discovery that differ between C++ ABIs.
pub trait VtableAbi: Send + Sync {
    fn abi(&self) -> Abi;

    /// Number of words in front of the first dispatch slot that the header
    /// check reads.
    fn header_words(&self) -> u64;

    /// Classify `value`, read from `address`, as a potential dispatch slot.
    fn classify(&self, ctx: &ScanContext<'_>, address: u64, value: u64) -> PointerClassification;

    /// Validate the header words in `window` for a table starting at
    /// `position`. `None` means "no vtable starts here".
    fn check_header(
        &self,
        ctx: &ScanContext<'_>,
        image: &dyn ImageAccessor,
        position: u64,
        window: &Window,
    ) -> Option<VtableHeader>;
}

/// Static strategy object for `abi`.
pub fn for_abi(abi: Abi) -> &'static dyn VtableAbi {
    match abi {
        Abi::Itanium => &ItaniumAbi,
        Abi::Msvc => &MsvcAbi,
    }
}
