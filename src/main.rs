//! Yoga Pose Trainer - guided pose sequence with live classification feedback
//!
//! Single-session, self-contained CLI application.
//! Keypoints come from a replayed estimator stream, Candle classifies them,
//! and the session state machine drives terminal feedback.

mod classifier;
mod cli;
mod config;
mod error;
mod pose;
mod session;

use clap::Parser;
use classifier::{CandleClassifier, ClassificationGate};
use cli::{print_summary, Display, InputHandler};
use config::{AppConfig, CountdownMode};
use pose::{spawn_replay, FeatureNormalizer, LatestPose, PoseCatalog, ReplayFeed};
use session::{RunEnd, SessionMachine, SessionRunner};
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "Yoga Pose Trainer")]
#[command(about = "Guided yoga pose sequence with live pose classification feedback")]
struct Args {
    /// Recorded keypoint stream (JSON lines, one frame per line)
    #[arg(short, long)]
    replay: PathBuf,

    /// Path to TOML configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to classifier weights (overrides config)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Path to pose catalog JSON (overrides config)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Countdown mode: tick or wall-clock (overrides config)
    #[arg(long)]
    countdown: Option<CountdownMode>,

    /// Coordinate noise added to replayed frames (overrides config)
    #[arg(long)]
    jitter: Option<f32>,

    /// Classifier call timeout in milliseconds (overrides config)
    #[arg(long)]
    classifier_timeout_ms: Option<u64>,

    /// Log file; the terminal is owned by the feedback display while a session runs
    #[arg(long, default_value = "yoga-pose-trainer.log")]
    log_file: PathBuf,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    /// Apply command-line overrides on top of the loaded config
    fn apply(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            config.model.path = model.clone();
        }
        if let Some(catalog) = &self.catalog {
            config.catalog.path = Some(catalog.clone());
        }
        if let Some(countdown) = self.countdown {
            config.session.countdown = countdown;
        }
        if let Some(jitter) = self.jitter {
            config.replay.jitter = jitter;
        }
        if let Some(timeout) = self.classifier_timeout_ms {
            config.schedule.classifier_timeout_ms = Some(timeout);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let log = File::create(&args.log_file)?;
    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(Mutex::new(log))
        .with_ansi(false)
        .init();

    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    if let Some(path) = &args.write_config {
        config.save(path)?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    let catalog = match &config.catalog.path {
        Some(path) => PoseCatalog::load(path)?,
        None => PoseCatalog::yoga_sequence(),
    };
    let classifier = CandleClassifier::load(&config.model.path)?;
    if classifier.is_loaded() {
        config.check_feature_width(classifier.config().input_size)?;
    }
    let feed = ReplayFeed::load(&args.replay)?;

    info!(
        "Loaded {} poses, {} replay frames, classifier ready: {}",
        catalog.len(),
        feed.len(),
        classifier.is_loaded()
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let slot = LatestPose::new();
        let replay = spawn_replay(
            feed,
            slot.clone(),
            Duration::from_millis(config.replay.frame_interval_ms),
            config.replay.jitter,
        );

        let [left, right] = &config.normalizer.reference_joints;
        let normalizer = FeatureNormalizer::new(
            &config.normalizer.joints,
            (left.as_str(), right.as_str()),
            config.normalizer.min_reference_confidence,
        );
        let gate = ClassificationGate::new(classifier)
            .with_timeout(config.schedule.classifier_timeout());
        let machine = SessionMachine::new(config.session.clone(), catalog.clone());

        let mut display = Display::new()?;
        display.clear()?;
        display.show_catalog(&catalog)?;

        let (tx, rx) = mpsc::channel(8);
        let input = InputHandler::new().spawn(tx);

        let report = SessionRunner::new(
            machine,
            normalizer,
            gate,
            slot,
            &mut display,
            config.schedule.clone(),
        )
        .run(rx)
        .await;

        replay.abort();
        display.shutdown()?;
        // Receiver is gone, the reader exits on its next poll
        let _ = input.await;

        print_summary(&report.stats, &catalog, report.end == RunEnd::Finished);
        println!("🙏 Thanks for practicing!");
        Ok::<(), Box<dyn Error>>(())
    })?;

    Ok(())
}
