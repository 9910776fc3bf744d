// AroundMe command line interface
// Replays recorded detector output through the navigation pipeline

mod replay;

use anyhow::{bail, Context, Result};
use aroundme_eye::models::UnavailableEngine;
use aroundme_eye::InferenceEngine;
use aroundme_nav::{NavigatorConfig, PipelineDriver, PipelineEvent, SubmitOutcome};
use aroundme_spk::{AlertMode, CustomHapticSink, CustomSpeechSink};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aroundme")]
#[command(about = "AroundMe obstacle announcer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded frames and print what would be spoken and vibrated
    Replay {
        /// JSON file with recorded frames
        #[arg(long, short)]
        input: PathBuf,

        /// Configuration file path (TOML)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Starting mode
        #[arg(long, value_enum)]
        mode: Option<CliMode>,

        /// Run as if no model could be loaded
        #[arg(long)]
        no_model: bool,
    },

    /// Validate a configuration file
    CheckConfig {
        /// Configuration file path (TOML)
        config: PathBuf,
    },

    /// Print the default configuration as TOML
    DefaultConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliMode {
    Normal,
    Continuous,
}

impl From<CliMode> for AlertMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Normal => AlertMode::Normal,
            CliMode::Continuous => AlertMode::Continuous,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs);

    match cli.command {
        Commands::Replay {
            input,
            config,
            mode,
            no_model,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(mode) = mode {
                config.initial_mode = mode.into();
            }
            run_replay(&input, config, no_model).await?;
        }
        Commands::CheckConfig { config } => {
            let config = NavigatorConfig::from_file(&config)
                .with_context(|| format!("{} is not a valid configuration", config.display()))?;
            println!(
                "Configuration OK (frame_skip: {}, backpressure: {:?}, {} labels)",
                config.frame_skip,
                config.backpressure,
                config.vision.labels.len()
            );
        }
        Commands::DefaultConfig => {
            print!("{}", toml::to_string_pretty(&NavigatorConfig::default())?);
        }
    }

    Ok(())
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<NavigatorConfig> {
    let mut config = match path {
        Some(path) => NavigatorConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => NavigatorConfig::default(),
    };
    config.apply_env();
    if let Err(e) = config.validate() {
        bail!("invalid configuration after environment overrides: {}", e);
    }
    Ok(config)
}

async fn run_replay(input: &Path, config: NavigatorConfig, no_model: bool) -> Result<()> {
    let frames = replay::load_frames(input)?;
    info!("Replaying {} frames from {}", frames.len(), input.display());

    let engine: Arc<dyn InferenceEngine> = if no_model {
        Arc::new(UnavailableEngine::new("disabled with --no-model"))
    } else {
        let columns = 5 + config.vision.labels.len();
        Arc::new(replay::ReplayEngine::new(&frames, columns)?)
    };

    let speech = CustomSpeechSink::always_idle("stdout", |text, interrupt| {
        if interrupt {
            println!("say (interrupt): {}", text);
        } else {
            println!("say: {}", text);
        }
        Ok(())
    });
    let haptics = CustomHapticSink::new(|pattern| {
        println!("vibrate: {} {:?}", pattern.name(), pattern.waveform_ms());
        Ok(())
    });

    let mut driver = PipelineDriver::start(config, Some(engine), Arc::new(speech), Arc::new(haptics))?;
    let mut events = driver.subscribe();

    let mut skipped = 0usize;
    let mut dropped = 0usize;
    for frame in &frames {
        match driver.submit(frame.to_frame()?) {
            SubmitOutcome::Accepted(seq) | SubmitOutcome::Replaced(seq) => {
                if !wait_for_frame(&mut events, seq).await? {
                    dropped += 1;
                }
            }
            SubmitOutcome::Skipped => skipped += 1,
            SubmitOutcome::Rejected => dropped += 1,
        }
    }

    let snapshot = driver.snapshot();
    driver.shutdown().await?;

    println!(
        "{} frames: {} processed, {} skipped, {} dropped, mode {:?}",
        frames.len(),
        snapshot.frames_processed,
        skipped,
        dropped,
        snapshot.mode()
    );
    Ok(())
}

/// Wait until frame `seq` is processed (true) or dropped (false)
async fn wait_for_frame(events: &mut broadcast::Receiver<PipelineEvent>, seq: u64) -> Result<bool> {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .with_context(|| format!("frame {} was not processed in time", seq))?;

        match event {
            Ok(PipelineEvent::FrameProcessed { seq: s, .. }) if s == seq => return Ok(true),
            Ok(PipelineEvent::FrameDropped { seq: Some(s), reason }) if s == seq => {
                warn!("Frame {} dropped: {:?}", seq, reason);
                return Ok(false);
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Missed {} pipeline events", n);
            }
            Err(broadcast::error::RecvError::Closed) => bail!("pipeline stopped unexpectedly"),
        }
    }
}
