use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::debug;
use vtscan_core::config::ScanConfig;
use vtscan_core::model::Abi;

use crate::parse_address;

/// Load the scan config from `path`, or start from defaults.
pub fn load_scan_config(path: Option<&str>) -> Result<ScanConfig> {
    match path {
        Some(p) => {
            let path = Path::new(p);
            if !path.is_file() {
                return Err(anyhow!("Config file does not exist: {}", path.display()));
            }
            debug!("loading scan config from {}", path.display());
            ScanConfig::load(path)
                .with_context(|| format!("Failed to load scan config at {}", path.display()))
        }
        None => Ok(ScanConfig::default()),
    }
}

/// Apply command-line overrides on top of a loaded config.
pub fn apply_overrides(
    config: &mut ScanConfig,
    pure_virtual: Option<&str>,
    abi: Option<&str>,
    allowed_zero_entries: Option<usize>,
) -> Result<()> {
    if let Some(addr) = pure_virtual {
        config.pure_virtual = parse_address(addr).context("Invalid --pure-virtual")?;
    }
    if let Some(abi) = abi {
        config.abi = Some(abi.parse::<Abi>().map_err(|e| anyhow!(e))?);
    }
    if let Some(n) = allowed_zero_entries {
        config.allowed_zero_entries = n;
    }
    Ok(())
}
