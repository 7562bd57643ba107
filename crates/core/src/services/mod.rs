//! Run orchestration and output serialization on top of `analysis`.

pub mod export;
pub mod scan;

pub use export::{export_all, format_vtable_record, got_entries, ExportedFiles, GotEntry};
pub use scan::{ScanReport, ScanRequest, ScanService};
