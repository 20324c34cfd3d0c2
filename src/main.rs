//! ocr-sync
//!
//! Replays a subtitle timeline against an external OCR tool: at each cue's
//! end time it presses the tool's shortcut, waits for the tool to copy its
//! result, and collects the clipboard text into a timestamped transcript.

mod config;
mod data;
mod input;
mod logging;
mod subtitle;
mod sync;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use config::Config;
use data::{write_transcript, ExportError};
use input::create_action_port;
use sync::{create_engine_channels, EngineEvent, SyncEngine, SystemClock};

/// Trigger an OCR tool along a subtitle timeline and collect its output
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a subtitle file and capture a transcript
    Run(RunArgs),

    /// Parse a subtitle file and report its cues
    Check {
        /// SubRip (.srt) file
        subtitle: PathBuf,
    },

    /// Show the configuration file and effective settings
    Config,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// SubRip (.srt) file whose cue end times drive the triggers
    subtitle: PathBuf,

    /// Transcript path (defaults to <subtitle stem>.txt)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// OCR shortcut, comma separated (e.g. "ctrl,alt,z")
    #[arg(short, long)]
    keys: Option<String>,

    /// Chord sent to the player when timing starts (e.g. "space")
    #[arg(long)]
    begin_keys: Option<String>,

    /// Milliseconds added to every cue end time; negative fires earlier
    #[arg(long, allow_negative_numbers = true)]
    offset_ms: Option<i64>,

    /// Countdown seconds before timing starts
    #[arg(short, long, allow_negative_numbers = true)]
    prep: Option<i64>,

    /// Milliseconds the OCR tool gets to copy its result
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Persist the given options to the configuration file
    #[arg(long)]
    save_config: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(keys) = &self.keys {
            config.sync.trigger_keys = keys.clone();
        }
        if let Some(begin) = &self.begin_keys {
            config.sync.begin_keys = Some(begin.clone());
        }
        if let Some(offset) = self.offset_ms {
            config.sync.offset_ms = offset;
        }
        if let Some(prep) = self.prep {
            config.sync.prep_seconds = prep;
        }
        if let Some(settle) = self.settle_ms {
            config.sync.settle_ms = settle;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = logging::init_logging(cli.verbose)?;
    info!("ocr-sync {} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load()?;
    info!("Configuration loaded from {:?}", config.config_path()?);

    match cli.command {
        Commands::Run(args) => run(&mut config, &args),
        Commands::Check { subtitle } => check(&subtitle),
        Commands::Config => show_config(&config),
    }
}

fn run(config: &mut Config, args: &RunArgs) -> Result<()> {
    args.apply(config);
    if args.save_config {
        config.save()?;
        info!("Saved options to {:?}", config.config_path()?);
    }

    let timeline = match subtitle::load_srt(&args.subtitle) {
        Ok(timeline) => timeline,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    println!("Loaded {} cues from {}", timeline.len(), args.subtitle.display());

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.transcript_path_for(&args.subtitle));

    let port: Arc<dyn input::ActionPort> = Arc::from(create_action_port(config.capture_timeout()));
    let (event_tx, mut event_rx) = create_engine_channels();
    let mut engine = SyncEngine::new(
        Arc::new(SystemClock::new()),
        port,
        config.engine_settings(),
        event_tx,
    );

    // Ctrl+C stops the run; whatever was captured so far is still exported
    let stop = engine.stop_handle();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, stopping run...");
        stop.stop();
    })?;

    if let Err(e) = engine.start(&timeline, &config.run_options()) {
        error!("Run not started: {}", e);
        std::process::exit(1);
    }

    println!("Switch to the video player now. Press Ctrl+C to stop.");

    let runtime = tokio::runtime::Runtime::new()?;
    let mut state_rx = engine.subscribe();
    let was_stopped = runtime.block_on(async move {
        loop {
            tokio::select! {
                Some(event) = event_rx.recv() => match event {
                    EngineEvent::Progress { remaining_secs } => {
                        println!("Starting in {}...", remaining_secs);
                    }
                    EngineEvent::Log { sequence_number, timestamp_label, text, .. } => {
                        println!("[{}] {} {}", sequence_number, timestamp_label, text);
                    }
                    EngineEvent::RunCompleted { was_stopped } => break was_stopped,
                    EngineEvent::RunFailed { error } => {
                        error!("Run failed: {}", error);
                        break true;
                    }
                },
                Ok(()) = state_rx.changed() => {
                    let snapshot = state_rx.borrow_and_update().clone();
                    debug!("Run state: {:?} (cue {})", snapshot.phase, snapshot.current_cue_index);
                }
            }
        }
    });

    let outcome = engine.wait();
    let records = engine.records().snapshot();
    if was_stopped {
        println!("Run stopped after {}/{} cues", records.len(), timeline.len());
    } else {
        println!("All {} cues triggered", timeline.len());
    }
    debug!("Run outcome: {:?}", outcome);

    export(&output, &records)
}

fn export(output: &Path, records: &[data::CapturedRecord]) -> Result<()> {
    match write_transcript(output, records) {
        Ok(count) => {
            println!("Wrote {} records to {}", count, output.display());
            Ok(())
        }
        Err(ExportError::Empty) => {
            warn!("Nothing was captured, no transcript written");
            println!("Nothing was captured, no transcript written");
            Ok(())
        }
        Err(e) => Err(e).context("Failed to export transcript"),
    }
}

fn check(path: &Path) -> Result<()> {
    let timeline = subtitle::load_srt(path)?;
    println!("{}: {} cues", path.display(), timeline.len());
    if let Some(first) = timeline.get(0) {
        println!(
            "First cue (#{}) ends at {}",
            first.sequence_number,
            data::format_timestamp_label(first.end_offset)
        );
    }
    println!(
        "Last cue ends at {}",
        data::format_timestamp_label(timeline.duration())
    );
    if !timeline.is_sorted() {
        println!("Warning: cues are not ordered by end time and will fire in file order");
    }
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    println!("Config file: {}", config.config_path()?.display());
    if let Ok(log_dir) = logging::get_log_dir() {
        println!("Log directory: {}", log_dir.display());
    }
    println!();
    println!(
        "{}",
        toml::to_string_pretty(config).context("Failed to serialize config")?
    );
    Ok(())
}
