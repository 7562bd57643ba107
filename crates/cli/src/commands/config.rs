use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use vtscan_core::config::ScanConfig;

use crate::parse_address;

/// Write a default scan config (YAML, or JSON for a `.json` path).
pub fn init_config_command(path: &str, pure_virtual: Option<&str>, force: bool) -> Result<()> {
    let path = Path::new(path);
    if path.exists() && !force {
        return Err(anyhow!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        ));
    }

    let mut config = ScanConfig::default();
    if let Some(addr) = pure_virtual {
        config.pure_virtual = parse_address(addr).context("Invalid --pure-virtual")?;
    }

    let text = config
        .to_string_for(path)
        .with_context(|| format!("Failed to serialize config for {}", path.display()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote scan config to {}", path.display());
    if config.pure_virtual == 0 {
        println!("  Set pure_virtual before scanning (or pass --pure-virtual to `scan`).");
    }
    Ok(())
}
