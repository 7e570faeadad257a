//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::targets;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the target argument
fn target_help() -> String {
    format!("Target to drive [available: {}]", targets::target_names())
}

#[derive(Parser)]
#[command(name = "riap")]
#[command(author, version, about = "In-application flash programming loader", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Target to drive, with optional parameters
    /// (e.g. dummy:state=flash.bin,aprom=128KiB)
    #[arg(short, long, global = true, default_value = "dummy", help = target_help())]
    pub target: String,

    /// Layout file (TOML format); defaults to the built-in map
    #[arg(long, global = true)]
    pub layout: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Program an image file into a region and verify it
    Program {
        /// Destination region name
        #[arg(short, long)]
        region: String,

        /// Image file to program
        #[arg(short, long)]
        image: PathBuf,
    },

    /// Compare a region against an image file
    Verify {
        /// Region name
        #[arg(short, long)]
        region: String,

        /// Image file to compare against
        #[arg(short, long)]
        image: PathBuf,
    },

    /// Show the layout, configuration words and boot source
    Info,

    /// Force the boot source to the application bank
    BootConfig,

    /// Hand execution over to the image in a region
    Branch {
        /// Region holding the image to branch into
        #[arg(short, long, default_value = "ap1")]
        region: String,

        /// Entry address override (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32)]
        entry: Option<u32>,

        /// Bound the output-drain wait to this many polls (0 = forever)
        #[arg(long, default_value_t = 0)]
        drain_attempts: u32,
    },

    /// Run the interactive loader flow
    ///
    /// Installs the loader image if the loader bank is blank, forces the
    /// boot source to the application bank, then loops the update/branch
    /// menu.
    Run {
        /// Second-stage loader image for the loader bank
        #[arg(long)]
        loader_image: Option<PathBuf>,

        /// Application image offered by the update menu
        #[arg(long)]
        app_image: Option<PathBuf>,

        /// Region the update/branch menu operates on
        #[arg(long, default_value = "ap1")]
        app_region: String,
    },

    /// List the regions of the active layout
    Regions,

    /// List available targets
    ListTargets,
}
