// CLI definitions using clap

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ps3pie")]
#[command(author, version, about = "Remap a PLAYSTATION(R)3 controller onto a virtual keyboard and joystick")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Profile path (default: ~/.config/ps3pie/profile.toml)
    #[arg(short, long, global = true)]
    pub profile: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remap the controller until interrupted (default)
    Run,

    /// Print the effective profile as TOML
    #[command(visible_alias = "show")]
    Profile {
        /// Also write it to the profile path
        #[arg(long)]
        save: bool,
    },

    /// Decode one raw input report and print the snapshot
    Decode {
        /// Report bytes in hex ("0100ff..." or "01 00 ff ...")
        hex: String,
    },
}

/// Parse a hex byte string, ignoring whitespace and `:`/`-`/`,` separators
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let digits: String = input
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, ':' | '-' | ','))
        .collect();

    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits ({})", digits.len());
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            let pair = &digits[i..i + 2];
            u8::from_str_radix(pair, 16).map_err(|_| anyhow::anyhow!("invalid hex byte {pair:?}"))
        })
        .collect()
}
