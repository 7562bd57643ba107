use anyhow::Result;
use clap::{Parser, Subcommand};
use vtscan::commands::{init_config_command, scan_command, sections_command, ScanOptions};
use vtscan::init_logging;

/// Recover C++ virtual function tables from stripped binaries.
///
/// This CLI is a thin wrapper around `vtscan-core` (exposed in code as
/// `vtscan_core`). All discovery logic lives in the library so it can be
/// tested thoroughly and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "vtscan",
    version,
    about = "Heuristic C++ vtable recovery for ELF and PE binaries",
    long_about = None
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a binary for vtables and export the results.
    ///
    /// Without --output-dir the vtable records are printed to stdout.
    Scan {
        /// Path to the ELF or PE binary.
        #[arg(long)]
        binary: String,

        /// Address of the pure-virtual handler (hex, e.g. 0x401230).
        #[arg(long)]
        pure_virtual: Option<String>,

        /// YAML or JSON scan config.
        #[arg(long)]
        config: Option<String>,

        /// Force the ABI (itanium or msvc) instead of inferring it from the format.
        #[arg(long)]
        abi: Option<String>,

        /// Module name written at the top of every export file.
        #[arg(long)]
        module_name: Option<String>,

        /// Directory for `<module>_vtables.txt` and related exports.
        #[arg(long)]
        output_dir: Option<String>,

        /// Number of zero slots the lookahead may cross.
        #[arg(long)]
        allowed_zero_entries: Option<usize>,

        /// Emit the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the sections of a binary as mapped for scanning.
    Sections {
        /// Path to the ELF or PE binary.
        #[arg(long)]
        binary: String,

        /// YAML or JSON scan config.
        #[arg(long)]
        config: Option<String>,

        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Write a default scan config file.
    InitConfig {
        /// Destination path (`.json` for JSON, anything else for YAML).
        #[arg(long, default_value = "vtscan.yaml")]
        path: String,

        /// Pure-virtual handler address to pre-fill.
        #[arg(long)]
        pure_virtual: Option<String>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Scan {
            binary,
            pure_virtual,
            config,
            abi,
            module_name,
            output_dir,
            allowed_zero_entries,
            json,
        } => scan_command(&ScanOptions {
            binary,
            pure_virtual,
            config,
            abi,
            module_name,
            output_dir,
            allowed_zero_entries,
            json,
        })?,
        Command::Sections { binary, config, json } => {
            sections_command(&binary, config.as_deref(), json)?
        }
        Command::InitConfig { path, pure_virtual, force } => {
            init_config_command(&path, pure_virtual.as_deref(), force)?
        }
    }

    Ok(())
}
