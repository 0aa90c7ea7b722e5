//! IPTV stream monitor.
//!
//! # Architecture Overview
//!
//! ```text
//!   playlist (file / http)
//!          │
//!          ▼
//!   ┌─────────────┐    ┌──────────────┐    ┌──────────────────────┐
//!   │  playlist   │───▶│   storage    │───▶│     orchestrator     │
//!   │ parse/select│    │ ChannelStore │    │ sequential │ monitor │
//!   └─────────────┘    └──────────────┘    └─────┬──────┴────┬────┘
//!                                                │           │
//!                                                ▼           ▼
//!                                          ┌──────────┐ ┌──────────┐
//!                                          │  probe   │ │  probe   │
//!                                          │continuous│ │  once    │
//!                                          └────┬─────┘ └────┬─────┘
//!                                               ▼            ▼
//!                                          ┌──────────┐ insert_result
//!                                          │ health + │
//!                                          │ session  │──▶ results.json
//!                                          └──────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use iptv_monitor::config::loader::{load_or_default, ConfigError};
use iptv_monitor::config::validation::validate_config;
use iptv_monitor::config::{MonitorConfig, SessionMode};
use iptv_monitor::fetch::Fetcher;
use iptv_monitor::lifecycle::signals::spawn_signal_handler;
use iptv_monitor::observability::{logging, metrics};
use iptv_monitor::orchestrator::{import_channels, run_monitor, Monitor, RunEnd, SessionRunner};
use iptv_monitor::playlist::{ChannelSelection, PlaylistSource};
use iptv_monitor::probe::{FfprobeProber, StreamProber};
use iptv_monitor::session::LoopMode;
use iptv_monitor::storage::{ChannelStore, MemoryStore};
use iptv_monitor::Shutdown;

#[derive(Parser)]
#[command(name = "iptv-monitor")]
#[command(about = "Probe IPTV streams and track their health over time", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test each channel in turn for a fixed window, writing a live snapshot
    Session {
        /// Playlist file or http(s) URL
        source: String,
        /// Window per channel in seconds
        #[arg(short, long)]
        duration: Option<u64>,
        /// single, N, loop-N or infinite
        #[arg(short, long, default_value = "single")]
        r#loop: LoopMode,
        /// Repeated short probes instead of one continuous probe
        #[arg(long)]
        periodic: bool,
        /// JSON list of {"url": ...} objects to restrict the run
        #[arg(short, long)]
        selection: Option<PathBuf>,
        /// Snapshot output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sweep all channels periodically until interrupted
    Monitor {
        source: String,
        #[arg(short, long)]
        interval: Option<u64>,
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Sweep all channels once and print the results
    Once {
        source: String,
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_or_default(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli.command);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);
    tracing::info!("iptv-monitor v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let ffprobe = FfprobeProber::new(config.probe.clone());
    match ffprobe.version().await {
        Some(version) => tracing::info!(version = %version, "ffprobe found"),
        None => tracing::warn!(path = %config.probe.ffprobe_path, "ffprobe not runnable; probes will report errors"),
    }
    let prober: Arc<dyn StreamProber> = Arc::new(ffprobe);

    let fetcher = Fetcher::new(config.fetch.clone())?;
    let memory = match &config.storage.channels_path {
        Some(path) => MemoryStore::load_from_file(path).await?,
        None => MemoryStore::new(None),
    };
    let store: Arc<dyn ChannelStore> = Arc::new(memory);

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    match cli.command {
        Commands::Session { source, r#loop, .. } => {
            let source = PlaylistSource::parse(&source);
            let selection = match &config.session.selection_path {
                Some(path) => Some(ChannelSelection::load(path)?),
                None => None,
            };

            let runner = SessionRunner::new(store, prober, fetcher, config.session.clone());
            let summary = runner
                .run(&source, selection.as_ref(), r#loop, shutdown.subscribe())
                .await?;

            match summary.end {
                RunEnd::Finished => tracing::info!(
                    iterations = summary.iterations_completed,
                    snapshot = %runner.snapshots().path().display(),
                    "Session finished"
                ),
                RunEnd::NoChannels => tracing::info!("No channels to test; exiting"),
                RunEnd::Interrupted => tracing::info!(
                    iterations = summary.iterations_completed,
                    "Session interrupted"
                ),
            }
        }
        Commands::Monitor { source, .. } => {
            let source = PlaylistSource::parse(&source);
            let monitor = build_monitor(&config, store.clone(), prober, fetcher.clone());
            match run_monitor(&monitor, store.as_ref(), &fetcher, &source, shutdown.subscribe()).await? {
                RunEnd::NoChannels => tracing::info!("No channels to monitor; exiting"),
                _ => tracing::info!("Monitor stopped"),
            }
        }
        Commands::Once { source, .. } => {
            let source = PlaylistSource::parse(&source);
            import_channels(store.as_ref(), &fetcher, &source, None).await?;

            let monitor = build_monitor(&config, store, prober, fetcher);
            let entries = monitor.run_once().await?;
            if entries.is_empty() {
                println!("No channels found.");
            }
            for entry in entries {
                println!("{}: {} - {}", entry.channel.name, entry.outcome.status, entry.outcome.notes);
            }
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut MonitorConfig, command: &Commands) {
    match command {
        Commands::Session { duration, periodic, selection, output, .. } => {
            if let Some(duration) = duration {
                config.session.duration_secs = *duration;
            }
            if *periodic {
                config.session.mode = SessionMode::Periodic;
            }
            if let Some(selection) = selection {
                config.session.selection_path = Some(selection.clone());
            }
            if let Some(output) = output {
                config.session.snapshot_path = output.clone();
            }
        }
        Commands::Monitor { interval, concurrency, .. } => {
            if let Some(interval) = interval {
                config.monitor.interval_secs = *interval;
            }
            if let Some(concurrency) = concurrency {
                config.monitor.concurrency = *concurrency;
            }
        }
        Commands::Once { concurrency, .. } => {
            if let Some(concurrency) = concurrency {
                config.monitor.concurrency = *concurrency;
            }
        }
    }
}

fn build_monitor(
    config: &MonitorConfig,
    store: Arc<dyn ChannelStore>,
    prober: Arc<dyn StreamProber>,
    fetcher: Fetcher,
) -> Monitor {
    let monitor = Monitor::new(store, prober, config.monitor.clone());
    if config.monitor.sample_throughput {
        tracing::info!(
            max_bytes = config.monitor.sample_max_bytes,
            timeout_secs = config.fetch.timeout_secs,
            "Throughput sampling enabled"
        );
        monitor.with_sampler(fetcher)
    } else {
        monitor
    }
}
