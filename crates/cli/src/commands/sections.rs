use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use vtscan_core::image::{load_binary_file, ImageAccessor};
use vtscan_core::model::Segment;

use crate::commands::load_scan_config;

#[derive(Debug, Serialize)]
struct SectionListing<'a> {
    binary: String,
    format: &'static str,
    machine: Option<&'a str>,
    image_base: u64,
    relocation_count: usize,
    segments: &'a [Segment],
}

/// Print the mapped sections of a binary as the scanner sees them.
pub fn sections_command(binary: &str, config: Option<&str>, json: bool) -> Result<()> {
    let path = Path::new(binary);
    if !path.is_file() {
        return Err(anyhow!("Binary does not exist: {}", path.display()));
    }
    let config = load_scan_config(config)?;
    let loaded = load_binary_file(path, &config)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    if json {
        let listing = SectionListing {
            binary: path.display().to_string(),
            format: loaded.format.as_str(),
            machine: loaded.machine.as_deref(),
            image_base: loaded.image.image_base(),
            relocation_count: loaded.relocations.len(),
            segments: loaded.image.segments(),
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!(
        "{} ({}, {}), image base 0x{:x}, {} relocations",
        path.display(),
        loaded.format.as_str(),
        loaded.machine.as_deref().unwrap_or("unknown machine"),
        loaded.image.image_base(),
        loaded.relocations.len()
    );
    for segment in loaded.image.segments() {
        let role = if config.is_vtable_section(&segment.name) {
            " [vtables]"
        } else if segment.name == config.sections.text {
            " [text]"
        } else {
            ""
        };
        println!(
            "  {:<20} 0x{:x}-0x{:x} {} ({} bytes){}",
            segment.name,
            segment.start,
            segment.end,
            segment.permissions,
            segment.size(),
            role
        );
    }
    Ok(())
}
