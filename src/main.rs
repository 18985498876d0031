//! ps3pie: PLAYSTATION(R)3 controller remapper
//!
//! Main entry point and run loop.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use ps3pie::cli::{parse_hex, Cli, Commands};
use ps3pie::hid::{ControllerReader, ReaderConfig};
use ps3pie::uinput::VirtualPad;
use ps3pie::worker::run_worker;
use ps3pie_core::engine::Engine;
use ps3pie_core::gate::report_channel;
use ps3pie_core::profile::Profile;
use ps3pie_core::report;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let profile_path = cli.profile.unwrap_or_else(Profile::default_path);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(profile_path).await,
        Commands::Profile { save } => show_profile(&profile_path, save),
        Commands::Decode { hex } => decode_report(&hex),
    }
}

fn load_profile(path: &Path) -> Result<Profile> {
    info!("Loading profile from {:?}", path);
    Profile::load(path).with_context(|| format!("Failed to load profile {}", path.display()))
}

/// Remap until Ctrl+C
async fn run(profile_path: PathBuf) -> Result<()> {
    let profile = Arc::new(load_profile(&profile_path)?);

    let mut pad = VirtualPad::new(&profile)?;
    info!("Created virtual device: {}", profile.device_name);
    if let Some(path) = pad.device_path() {
        info!("Device path: {}", path.display());
    }

    let (gate, inbox) = report_channel();
    let engine = Engine::new(Arc::clone(&profile));
    let mut worker = tokio::spawn(run_worker(engine, inbox, pad));
    let mut reader = ControllerReader::spawn(gate, ReaderConfig::default())?;

    info!("Running. Press Ctrl+C to exit.");

    let finished = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for Ctrl+C")?;
            None
        }
        res = &mut worker => Some(res?),
    };

    info!("Shutting down");
    tokio::task::spawn_blocking(move || reader.stop()).await?;
    let (pad, stats) = match finished {
        Some(done) => {
            warn!("Worker stopped before shutdown was requested");
            done
        }
        None => worker.await?,
    };
    // Dropping the device removes it from the system
    drop(pad);

    info!(
        "Processed {} reports ({} undecodable, {} failed writes, {} calibrations)",
        stats.cycles, stats.decode_errors, stats.emission_errors, stats.calibrations
    );
    Ok(())
}

/// Print the effective profile, optionally saving it
fn show_profile(profile_path: &Path, save: bool) -> Result<()> {
    let profile = load_profile(profile_path)?;
    print!("{}", profile.to_toml()?);
    if save {
        profile.save(profile_path)?;
        info!("Saved profile to {:?}", profile_path);
    }
    Ok(())
}

/// Decode one report given on the command line
fn decode_report(hex: &str) -> Result<()> {
    let data = parse_hex(hex)?;
    let snapshot = report::decode(&data)?;
    println!("{snapshot}");
    Ok(())
}
