use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::analysis::scan_image;
use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult};
use crate::image::{load_binary_file, BinaryFormat, ImageAccessor, RelocationProvider};
use crate::model::{Abi, Segment, VtableCandidate};
use crate::services::export::{got_entries, GotEntry};

/// Request to scan one binary for vtables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub binary_path: PathBuf,
    /// Name written at the top of every export file. Defaults to the file name.
    pub module_name: Option<String>,
    pub config: ScanConfig,
}

impl ScanRequest {
    pub fn new(binary_path: impl Into<PathBuf>, config: ScanConfig) -> Self {
        Self { binary_path: binary_path.into(), module_name: None, config }
    }

    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = Some(name.into());
        self
    }

    /// Check the preconditions that do not need any I/O.
    pub fn validate(&self) -> ScanResult<()> {
        if self.binary_path.as_os_str().is_empty() {
            return Err(ScanError::Configuration("binary path must not be empty".into()));
        }
        self.config.validate()
    }

    /// The module name to export under.
    pub fn resolved_module_name(&self) -> String {
        self.module_name.clone().unwrap_or_else(|| module_name_for(&self.binary_path))
    }
}

/// File name of `path`, or `unnamed-module` when it has none.
pub fn module_name_for(path: &Path) -> String {
    path.file_name().and_then(|os| os.to_str()).unwrap_or("unnamed-module").to_string()
}

/// Everything a completed scan produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub module_name: String,
    pub format: BinaryFormat,
    pub abi: Abi,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    pub image_base: u64,
    pub pure_virtual: u64,
    pub segments: Vec<Segment>,
    pub relocation_count: usize,
    /// Recovered vtables in ascending address order.
    pub vtables: Vec<VtableCandidate>,
    /// Candidates dropped as overlapping duplicates.
    pub removed_candidates: Vec<u64>,
    /// `.got` slots (ELF only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub got: Vec<GotEntry>,
}

/// Loads a binary, runs the discovery pipeline and assembles a report.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanService;

impl ScanService {
    pub fn run(&self, request: &ScanRequest) -> ScanResult<ScanReport> {
        request.validate()?;
        if !request.binary_path.is_file() {
            return Err(ScanError::MissingBinary(request.binary_path.clone()));
        }

        let config = &request.config;
        let loaded = load_binary_file(&request.binary_path, config)?;
        let abi = config.abi.unwrap_or(match loaded.format {
            BinaryFormat::Elf => Abi::Itanium,
            BinaryFormat::Pe => Abi::Msvc,
        });
        info!("Scanning {} as {} ({:?})", request.binary_path.display(), abi, loaded.format);

        let relocations = loaded.relocated_addresses();
        let scan = scan_image(&loaded.image, relocations, config, abi);
        let got = match loaded.format {
            BinaryFormat::Elf => got_entries(&loaded.image, &config.sections.got),
            BinaryFormat::Pe => Vec::new(),
        };

        Ok(ScanReport {
            module_name: request.resolved_module_name(),
            format: loaded.format,
            abi,
            machine: loaded.machine.clone(),
            image_base: loaded.image.image_base(),
            pure_virtual: config.pure_virtual,
            segments: loaded.image.segments().to_vec(),
            relocation_count: relocations.len(),
            vtables: scan.candidates(),
            removed_candidates: scan.removed,
            got,
        })
    }
}
