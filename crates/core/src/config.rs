//! Scan configuration: ABI selection, sentinel, section names and heuristic knobs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ScanError, ScanResult};
use crate::model::Abi;

/// Default number of zero slots tolerated at the start of a vtable.
pub const DEFAULT_ALLOWED_ZERO_ENTRIES: usize = 2;

/// Default magnitude bound for a plausible offset-to-top value.
pub const DEFAULT_OFFSET_TO_TOP_BOUND: i64 = 0xFF_FFFF;

/// Names of the sections the scanner treats specially.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionNames {
    /// Section holding function bodies.
    pub text: String,
    /// Synthetic section of imported symbols, when the image has one.
    #[serde(rename = "extern")]
    pub extern_: String,
    /// PLT-style stub sections (any of them counts as PLT).
    pub plt: Vec<String>,
    /// Global offset table (dumped for ELF exports).
    pub got: String,
    /// Relocation sections whose target offsets form the relocation set.
    pub relocations: Vec<String>,
}

impl Default for SectionNames {
    fn default() -> Self {
        Self {
            text: ".text".to_string(),
            extern_: "extern".to_string(),
            plt: vec![".plt".to_string(), ".plt.sec".to_string(), ".plt.got".to_string()],
            got: ".got".to_string(),
            relocations: vec![".rela.dyn".to_string(), ".rela.plt".to_string()],
        }
    }
}

/// Serializable configuration for one scan run.
///
/// Lives on disk as YAML or JSON (see [`ScanConfig::load`]); every field has
/// a default except the pure-virtual sentinel, which must be supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Explicit ABI; inferred from the container format when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<Abi>,
    /// Address of the runtime's pure-virtual-call handler.
    pub pure_virtual: u64,
    /// Sections that may host vtables.
    pub vtable_sections: Vec<String>,
    /// Zero slots tolerated at the start of a vtable candidate.
    pub allowed_zero_entries: usize,
    /// Offsets-to-top outside `[-bound, bound]` reject a candidate.
    pub offset_to_top_bound: i64,
    /// Overrides whether leading zero slots are tolerated (Itanium: on, MSVC: off).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zero_tolerance: Option<bool>,
    pub sections: SectionNames,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            abi: None,
            pure_virtual: 0,
            vtable_sections: [".rodata", ".data.rel.ro", ".data.rel.ro.local", ".rdata"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allowed_zero_entries: DEFAULT_ALLOWED_ZERO_ENTRIES,
            offset_to_top_bound: DEFAULT_OFFSET_TO_TOP_BOUND,
            zero_tolerance: None,
            sections: SectionNames::default(),
        }
    }
}

impl ScanConfig {
    pub fn new(pure_virtual: u64) -> Self {
        Self { pure_virtual, ..Self::default() }
    }

    pub fn with_abi(mut self, abi: Abi) -> Self {
        self.abi = Some(abi);
        self
    }

    pub fn with_vtable_sections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vtable_sections = names.into_iter().map(Into::into).collect();
        self
    }

    /// Load a config from disk. `.json` files are parsed as JSON, anything
    /// else as YAML.
    pub fn load(path: &Path) -> ScanResult<Self> {
        let bytes = fs::read(path)?;
        let config = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_slice(&bytes)?
        } else {
            serde_yaml::from_slice(&bytes)?
        };
        Ok(config)
    }

    /// Serialize for writing to `path`, picking the format the same way
    /// [`ScanConfig::load`] does.
    pub fn to_string_for(&self, path: &Path) -> ScanResult<String> {
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            Ok(serde_json::to_string_pretty(self)?)
        } else {
            Ok(serde_yaml::to_string(self)?)
        }
    }

    pub fn validate(&self) -> ScanResult<()> {
        if self.pure_virtual == 0 {
            return Err(ScanError::Configuration(
                "pure-virtual sentinel address must be non-zero".into(),
            ));
        }
        if self.vtable_sections.is_empty() {
            return Err(ScanError::Configuration(
                "at least one vtable section name is required".into(),
            ));
        }
        if self.offset_to_top_bound < 0 {
            return Err(ScanError::Configuration(
                "offset-to-top bound must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Whether leading zero slots are tolerated under `abi`.
    pub fn zero_tolerance_for(&self, abi: Abi) -> bool {
        self.zero_tolerance.unwrap_or(matches!(abi, Abi::Itanium))
    }

    pub fn is_vtable_section(&self, name: &str) -> bool {
        self.vtable_sections.iter().any(|s| s == name)
    }
}
