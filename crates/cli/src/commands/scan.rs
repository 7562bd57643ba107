use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Serialize;
use vtscan_core::services::export::{export_all, write_vtables};
use vtscan_core::services::{ScanReport, ScanRequest, ScanService};

use crate::commands::{apply_overrides, load_scan_config};
use crate::sha256_file;

/// Inputs of the `scan` command.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub binary: String,
    pub pure_virtual: Option<String>,
    pub config: Option<String>,
    pub abi: Option<String>,
    pub module_name: Option<String>,
    pub output_dir: Option<String>,
    pub allowed_zero_entries: Option<usize>,
    pub json: bool,
}

/// JSON envelope around a scan report.
#[derive(Debug, Serialize)]
pub struct ScanSnapshot {
    pub binary: String,
    pub binary_sha256: String,
    pub started_at: String,
    pub finished_at: String,
    pub tool_version: String,
    #[serde(flatten)]
    pub report: ScanReport,
}

/// Run a scan and export its results.
///
/// Nothing is written unless the scan itself succeeded.
pub fn scan_command(opts: &ScanOptions) -> Result<()> {
    if opts.binary.trim().is_empty() {
        return Err(anyhow!("--binary must not be empty"));
    }

    let mut config = load_scan_config(opts.config.as_deref())?;
    apply_overrides(
        &mut config,
        opts.pure_virtual.as_deref(),
        opts.abi.as_deref(),
        opts.allowed_zero_entries,
    )?;

    let binary_path = PathBuf::from(&opts.binary);
    let mut request = ScanRequest::new(&binary_path, config);
    if let Some(name) = &opts.module_name {
        request = request.with_module_name(name);
    }

    let started_at = Utc::now().to_rfc3339();
    let report = ScanService
        .run(&request)
        .with_context(|| format!("Scan failed for {}", binary_path.display()))?;
    let finished_at = Utc::now().to_rfc3339();

    if opts.json {
        let snapshot = ScanSnapshot {
            binary: binary_path.display().to_string(),
            binary_sha256: sha256_file(&binary_path)?,
            started_at,
            finished_at,
            tool_version: vtscan_core::version().to_string(),
            report,
        };
        let json = serde_json::to_string_pretty(&snapshot)
            .context("Failed to serialize scan report to JSON")?;
        match &opts.output_dir {
            Some(dir) => {
                let dir = Path::new(dir);
                let written = export_all(&snapshot.report, dir).with_context(|| {
                    format!("Failed to write exports to {}", dir.display())
                })?;
                let json_path = dir.join(format!("{}_report.json", snapshot.report.module_name));
                fs::write(&json_path, json).with_context(|| {
                    format!("Failed to write JSON report to {}", json_path.display())
                })?;
                print_summary(&snapshot.report, &written.vtables);
                println!("  JSON report: {}", json_path.display());
            }
            None => println!("{json}"),
        }
        return Ok(());
    }

    match &opts.output_dir {
        Some(dir) => {
            let dir = Path::new(dir);
            let written = export_all(&report, dir)
                .with_context(|| format!("Failed to write exports to {}", dir.display()))?;
            print_summary(&report, &written.vtables);
            println!("  Blacklist: {}", written.blacklist.display());
            if let Some(got) = &written.got {
                println!("  GOT: {}", got.display());
            }
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_vtables(&mut out, &report.module_name, &report.vtables)
                .context("Failed to write vtable records")?;
            out.flush()?;
        }
    }

    Ok(())
}

fn print_summary(report: &ScanReport, vtables_path: &Path) {
    println!(
        "Scanned {} ({}, {} ABI):",
        report.module_name,
        report.format.as_str(),
        report.abi
    );
    println!("  Vtables: {}", report.vtables.len());
    println!("  Removed overlapping candidates: {}", report.removed_candidates.len());
    println!("  Vtable records: {}", vtables_path.display());
}
