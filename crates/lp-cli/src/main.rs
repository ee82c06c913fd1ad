//! CLI entry point for the live signal pipe.
//!
//! This binary watches a drop directory for NDJSON signal files and feeds
//! every valid, previously unseen signal to a demo consumer that accepts
//! everything and can mirror delivered records to a file.
//!
//! # Usage
//!
//! ```bash
//! live-pipe [OPTIONS]
//!
//! # Run with defaults (./inbox/signals, ./artifacts/...)
//! live-pipe
//!
//! # Load a JSON config, override the inbox, mirror deliveries
//! live-pipe --config pipe.json --watch-dir /data/inbox --output delivered.ndjson
//!
//! # Network filesystem: poll instead of OS notifications
//! live-pipe --poll
//! ```
//!
//! Stop with Ctrl-C or SIGTERM; the pending batch is flushed before exit.

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::fs::{File, OpenOptions};
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, ValueEnum};
use lp_core::{PipeConfig, Signal, WatchBackend};
use lp_pipe::{
    DispatchError, HandleStatus, HandlerAdapter, LivePipe, PipeHandle, SignalHandler,
    StatsSnapshot,
};
use parking_lot::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Live NDJSON signal ingestion.
///
/// Tails signal files dropped into a directory, validates and deduplicates
/// each record, and delivers them downstream in batches with retry and
/// dead-lettering.
#[derive(Parser)]
#[command(name = "live-pipe", version, about, long_about = None)]
struct Cli {
    /// JSON config file. CLI flags override its values.
    #[arg(short, long, env = "LIVE_PIPE_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Directory to watch for signal files.
    #[arg(long, env = "LIVE_PIPE_WATCH_DIR")]
    watch_dir: Option<Utf8PathBuf>,

    /// Directory for per-file offset checkpoints.
    #[arg(long, env = "LIVE_PIPE_STATE_DIR")]
    state_dir: Option<Utf8PathBuf>,

    /// Directory for dead-letter files.
    #[arg(long, env = "LIVE_PIPE_DLQ_DIR")]
    dlq_dir: Option<Utf8PathBuf>,

    /// Directory for the dispatch event log.
    #[arg(long, env = "LIVE_PIPE_LOG_DIR")]
    log_dir: Option<Utf8PathBuf>,

    /// Glob matched against file names in the watch directory.
    #[arg(long, env = "LIVE_PIPE_FILE_GLOB")]
    file_glob: Option<String>,

    /// Poll the directory instead of using OS notifications.
    #[arg(long, env = "LIVE_PIPE_POLL")]
    poll: bool,

    /// Append every delivered signal to this NDJSON file.
    #[arg(short, long, env = "LIVE_PIPE_OUTPUT")]
    output: Option<Utf8PathBuf>,

    /// Format of the statistics printed on exit.
    #[arg(long, value_enum, default_value_t = StatsFormat::Text)]
    stats_format: StatsFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
}

/// Exit statistics format.
#[derive(Clone, Copy, ValueEnum)]
enum StatsFormat {
    /// Human-readable summary.
    Text,
    /// One JSON object.
    Json,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Builds a [`PipeConfig`] from the optional config file and CLI overrides.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed.
fn build_config(cli: &Cli) -> color_eyre::Result<PipeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!(path = %path, "Loading config");
            PipeConfig::from_json_file(path)?
        }
        None => PipeConfig::default(),
    };

    if let Some(dir) = &cli.watch_dir {
        config.watch_dir.clone_from(dir);
    }
    if let Some(dir) = &cli.state_dir {
        config.state_dir.clone_from(dir);
    }
    if let Some(dir) = &cli.dlq_dir {
        config.dlq_dir.clone_from(dir);
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir.clone_from(dir);
    }
    if let Some(glob) = &cli.file_glob {
        config.file_glob.clone_from(glob);
    }
    if cli.poll {
        config.watch.backend = WatchBackend::Poll;
    }

    Ok(config)
}

// =============================================================================
// DEMO CONSUMER
// =============================================================================

/// Accepts every signal, optionally mirroring it to an NDJSON file.
struct DemoHandler {
    output: Option<Mutex<File>>,
}

impl DemoHandler {
    fn new(output: Option<&Utf8Path>) -> color_eyre::Result<Self> {
        let output = output
            .map(|path| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map(Mutex::new)
                    .map_err(|e| color_eyre::eyre::eyre!("Failed to open output {path}: {e}"))
            })
            .transpose()?;
        Ok(Self { output })
    }
}

impl SignalHandler for DemoHandler {
    fn handle_signal(&self, signal: &Signal) -> Result<HandleStatus, DispatchError> {
        if let Some(output) = &self.output {
            let mut line = serde_json::to_string(signal).map_err(|e| DispatchError::new(e.to_string()))?;
            line.push('\n');
            output.lock().write_all(line.as_bytes())?;
        }
        Ok(HandleStatus::Accepted)
    }
}

// =============================================================================
// SHUTDOWN
// =============================================================================

/// Waits for Ctrl-C, or SIGTERM on Unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM, Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl-C, shutting down");
    }
}

fn spawn_shutdown_listener(handle: PipeHandle) {
    tokio::spawn(async move {
        wait_for_shutdown().await;
        handle.stop();
    });
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints the final statistics.
fn print_stats(stats: &StatsSnapshot, format: StatsFormat) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    match format {
        StatsFormat::Json => {
            serde_json::to_writer(&mut handle, stats)?;
            writeln!(handle)?;
        }
        StatsFormat::Text => {
            writeln!(handle)?;
            writeln!(handle, "Live Pipe Summary")?;
            writeln!(handle, "=================")?;
            writeln!(handle)?;
            writeln!(handle, "Lines read:          {}", stats.lines_read)?;
            writeln!(handle, "  Malformed:         {}", stats.malformed_lines)?;
            writeln!(handle, "  Invalid:           {}", stats.invalid_records)?;
            writeln!(handle, "  Duplicates:        {}", stats.duplicates)?;
            writeln!(handle, "  Admitted:          {}", stats.admitted)?;
            writeln!(handle)?;
            writeln!(handle, "Batches dispatched:  {}", stats.batches_dispatched)?;
            writeln!(handle, "Batches quarantined: {}", stats.batches_quarantined)?;
            writeln!(handle, "Dispatch failures:   {}", stats.dispatch_failures)?;
            writeln!(handle)?;
            writeln!(handle, "Records accepted:    {}", stats.records_accepted)?;
            writeln!(handle, "Records rejected:    {}", stats.records_rejected)?;
            writeln!(handle, "Dead-lettered:       {}", stats.dead_lettered())?;
            writeln!(handle, "Acceptance rate:     {:.1}%", stats.acceptance_rate())?;
        }
    }

    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Build the pipe
    let config = build_config(&cli)?;
    let consumer = HandlerAdapter::new(DemoHandler::new(cli.output.as_deref())?);
    let pipe = LivePipe::new(config, consumer)?;

    // 5. Run until Ctrl-C / SIGTERM
    spawn_shutdown_listener(pipe.handle());
    let stats = pipe.run().await?;

    print_stats(&stats, cli.stats_format)
}
