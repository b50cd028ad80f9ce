// src/main.rs
mod app;
mod config;
mod dispatcher;
mod envelope;
mod features;
mod gesture;
mod playback;
mod pose;
mod probe;
mod recorder;
mod session;
mod tracking;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::PosePlayerApp;
use crate::config::AppConfig;
use crate::playback::ProcessPlayer;
use crate::recorder::SessionRecorder;
use crate::tracking::{Simulator, TrackingSource};

#[derive(Parser)]
#[command(name = "pose_player", version, about = "Pose-triggered media playback")]
struct Cli {
    /// Configuration file (JSON). Defaults to the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the session loop.
    Run {
        /// Replay recorded frames (JSON lines) instead of the simulated tracker.
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Write session events to CSV.
        #[arg(long)]
        record: bool,
    },
    /// Print offsets and matching envelopes for each frame of a recording.
    Probe { recording: PathBuf },
    /// Print the built-in configuration.
    DefaultConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::DefaultConfig => {
            println!("{}", serde_json::to_string_pretty(&AppConfig::default())?);
            Ok(())
        }
        Command::Probe { recording } => {
            let config = AppConfig::load_or_default(cli.config.as_deref())?;
            let mut source = TrackingSource::replay(&recording)
                .with_context(|| format!("opening {}", recording.display()))?;

            let stdout = std::io::stdout();
            let stats = probe::probe(&mut source, &config.gestures, &mut stdout.lock())?;
            info!(
                frames = stats.frames,
                single_person = stats.single_person,
                invalid = stats.invalid,
                "probe finished"
            );
            Ok(())
        }
        Command::Run { replay, record } => {
            let config = AppConfig::load_or_default(cli.config.as_deref())
                .context("loading configuration")?;
            run(config, replay, record).await
        }
    }
}

async fn run(config: AppConfig, replay: Option<PathBuf>, record: bool) -> Result<()> {
    let source = match replay {
        Some(path) => TrackingSource::replay(&path)
            .with_context(|| format!("opening {}", path.display()))?,
        None => TrackingSource::simulated(Simulator::demo()),
    };

    let player = ProcessPlayer::new(config.playback.clone());
    let mut app = PosePlayerApp::new(&config, source, player);

    if record || config.recorder.enabled {
        let recorder = SessionRecorder::create(config.recorder.resolved_output_dir())?;
        app = app.with_recorder(recorder);
    }

    let quit = app.quit_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => quit.store(true, Ordering::Release),
            Err(e) => warn!(error = %e, "could not listen for ctrl-c"),
        }
    });

    info!(
        tick_rate_hz = config.runtime.tick_rate_hz,
        poses = config.gestures.poses.len() + config.gestures.sequences.len(),
        "starting session loop"
    );
    let summary = app.run().await;
    info!(
        gestures = summary.gestures.len(),
        aborts = summary.aborts,
        "done"
    );
    Ok(())
}
