//! Vtable discovery: classification, scanning, entry extraction and
//! false-positive filtering.
//!
//! Data flows through the submodules in this order:
//! image + relocations → `abi` classifiers → `scanner` (address → header)
//! → `entries` (address → slots) → `disambiguate` (filters both maps).
//!
//! All per-run state (segment bounds, sentinel, relocation set, heuristic
//! knobs) lives in one immutable [`ScanContext`] built once per run.

pub mod abi;
pub mod disambiguate;
pub mod entries;
pub mod scanner;

pub use abi::{for_abi, ItaniumAbi, MsvcAbi, VtableAbi};
pub use disambiguate::disambiguate;
pub use entries::EntryExtractor;
pub use scanner::{VtableScanner, Window};

use log::{info, warn};

use crate::config::ScanConfig;
use crate::image::ImageAccessor;
use crate::model::{
    Abi, AddressRange, OffsetToTopMap, RelocationSet, Segment, VtableCandidate, VtableEntrySet,
};

/// Immutable per-run view of everything the heuristics consult.
#[derive(Debug, Clone)]
pub struct ScanContext<'a> {
    pub abi: Abi,
    pub text: AddressRange,
    pub extern_range: AddressRange,
    pub plt: Vec<AddressRange>,
    /// Segments eligible to host vtables, in image order.
    pub vtable_sections: Vec<Segment>,
    pub pure_virtual: u64,
    pub relocations: &'a RelocationSet,
    pub allowed_zero_entries: usize,
    pub offset_to_top_bound: i64,
    pub zero_tolerance: bool,
}

impl<'a> ScanContext<'a> {
    /// Resolve section names from `config` against the image's segments.
    pub fn new(
        segments: &[Segment],
        relocations: &'a RelocationSet,
        config: &ScanConfig,
        abi: Abi,
    ) -> Self {
        let names = &config.sections;
        let range_of = |name: &str| {
            segments.iter().find(|s| s.name == name).map(Segment::range).unwrap_or_default()
        };

        let text = range_of(&names.text);
        if text.is_empty() {
            warn!("no '{}' segment found; code pointer checks will reject everything", names.text);
        }

        let plt = segments
            .iter()
            .filter(|s| names.plt.iter().any(|p| p == &s.name))
            .map(Segment::range)
            .collect();

        let vtable_sections: Vec<Segment> =
            segments.iter().filter(|s| config.is_vtable_section(&s.name)).cloned().collect();
        if vtable_sections.is_empty() {
            warn!("none of the configured vtable sections {:?} exist", config.vtable_sections);
        }

        Self {
            abi,
            text,
            extern_range: range_of(&names.extern_),
            plt,
            vtable_sections,
            pure_virtual: config.pure_virtual,
            relocations,
            allowed_zero_entries: config.allowed_zero_entries,
            offset_to_top_bound: config.offset_to_top_bound,
            zero_tolerance: config.zero_tolerance_for(abi),
        }
    }

    pub fn in_text(&self, value: u64) -> bool {
        self.text.contains(value)
    }

    pub fn in_plt(&self, value: u64) -> bool {
        self.plt.iter().any(|r| r.contains(value))
    }

    /// Whether `value` falls inside any vtable-hosting section.
    pub fn in_vtable_section(&self, value: u64) -> bool {
        self.vtable_sections.iter().any(|s| s.contains(value))
    }

    /// The vtable-hosting section containing `address`, if any.
    pub fn hosting_section(&self, address: u64) -> Option<&Segment> {
        self.vtable_sections.iter().find(|s| s.contains(address))
    }
}

/// Raw output of one scan run, before merging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VtableScan {
    pub offsets: OffsetToTopMap,
    pub entries: VtableEntrySet,
    /// Candidates dropped by the disambiguation pass.
    pub removed: Vec<u64>,
}

impl VtableScan {
    /// Surviving vtables in ascending address order.
    pub fn candidates(&self) -> Vec<VtableCandidate> {
        VtableCandidate::merge(&self.offsets, &self.entries)
    }
}

/// Run the full discovery pipeline over `image`.
///
/// Sections are scanned one after another; the disambiguation pass only
/// runs once every section has been scanned, and only when zero-slot
/// tolerance is on.
pub fn scan_image(
    image: &dyn ImageAccessor,
    relocations: &RelocationSet,
    config: &ScanConfig,
    abi: Abi,
) -> VtableScan {
    let ctx = ScanContext::new(image.segments(), relocations, config, abi);

    let scanner = VtableScanner::new(image, &ctx);
    let mut offsets = scanner.scan();

    let extractor = EntryExtractor::new(image, &ctx);
    let mut entries = extractor.extract_all(&offsets);

    // Overlaps only arise from the zero-slot lookahead.
    let removed = if ctx.zero_tolerance {
        disambiguate(image, &mut offsets, &mut entries, ctx.allowed_zero_entries)
    } else {
        Vec::new()
    };

    info!(
        "{} scan: {} vtables kept, {} overlapping candidates removed",
        abi,
        offsets.len(),
        removed.len()
    );

    VtableScan { offsets, entries, removed }
}
