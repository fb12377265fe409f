use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use savegame_miner::monitor::{SaveAnalysis, process_save_with_progress, save_name};
use savegame_miner::utils::modified_millis;
use savegame_miner::{
    Monitor, MonitorConfig, MonitorEvent, SaveIdentity, StatusRequest, run_monitor, run_pipeline,
};

#[derive(Parser)]
#[command(name = "savegame-miner")]
#[command(about = "Extract structured sections and derived datasets from game saves")]
#[command(version)]
struct Cli {
    /// Log debug output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one save and derive its datasets
    Extract {
        /// Save file, `.xml` or `.xml.gz`
        save: PathBuf,
        /// Directory receiving sections and datasets
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Re-run the derivation steps on already extracted sections
    Derive {
        /// Directory holding the sections
        output: PathBuf,
    },

    /// Run a single monitor tick and print its report
    Tick {
        #[arg(long)]
        saves: Option<PathBuf>,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Watch a save directory; answer `status` lines on stdin
    Monitor {
        #[arg(long)]
        saves: Option<PathBuf>,
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Seconds between ticks
        #[arg(long)]
        interval: Option<u64>,
        /// Append tick events as JSON lines to this file
        #[arg(long)]
        events: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>, saves: Option<PathBuf>, output: Option<PathBuf>) -> Result<MonitorConfig> {
    let mut config = match path {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(saves) = saves {
        config.save_dir = saves;
    }
    if let Some(output) = output {
        config.output_dir = output;
    }
    Ok(config)
}

fn extract(save: &Path, output: &Path, config: &MonitorConfig) -> Result<()> {
    let identity = SaveIdentity {
        name: save_name(save).unwrap_or_else(|| save.display().to_string()),
        source: save.to_path_buf(),
        modified_ms: modified_millis(save)?,
        output_dir: output.to_path_buf(),
    };
    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?
            .progress_chars("#>-"),
    );

    let SaveAnalysis { extraction, pipeline } =
        process_save_with_progress(&identity, &config.extractor, &config.derivation, Some(progress))?;

    println!("{}", serde_json::to_string_pretty(&extraction)?);
    println!("{}", serde_json::to_string_pretty(&pipeline)?);
    Ok(())
}

async fn serve_stdin(requests: mpsc::Sender<StatusRequest>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "status" => {
                let (request, reply) = StatusRequest::new();
                if requests.send(request).await.is_err() {
                    break;
                }
                let report = reply.await.context("Monitor dropped the status request")?;
                println!("{}", serde_json::to_string(&report)?);
            }
            other => warn!("Unknown command: {}", other),
        }
    }
    info!("stdin closed, status requests disabled");
    Ok(())
}

async fn record_events(path: PathBuf, mut events: mpsc::UnboundedReceiver<MonitorEvent>) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .with_context(|| format!("Failed to open event log {}", path.display()))?;
    while let Some(event) = events.recv().await {
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
    }
    file.flush().await?;
    Ok(())
}

async fn monitor(config: MonitorConfig, interval: Duration, events: Option<PathBuf>) -> Result<()> {
    let mut monitor = Monitor::new(config);
    if let Some(path) = events {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        monitor = monitor.with_events(event_tx);
        tokio::spawn(async move {
            if let Err(e) = record_events(path, event_rx).await {
                warn!("Event log stopped: {:#}", e);
            }
        });
    }

    let (request_tx, request_rx) = mpsc::channel(16);
    tokio::spawn(async move {
        if let Err(e) = serve_stdin(request_tx).await {
            warn!("Status input stopped: {:#}", e);
        }
    });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
        }
    };
    let monitor = run_monitor(monitor, interval, request_rx, shutdown).await;
    info!(
        "Monitor stopped: {} ticks, {} saves processed",
        monitor.ticks(),
        monitor.processed_total()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Extract { save, output } => {
            let config = load_config(config_path, None, None)?;
            extract(&save, &output, &config)
        }
        Commands::Derive { output } => {
            let config = load_config(config_path, None, None)?;
            let summary = run_pipeline(&output, &config.derivation)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Commands::Tick { saves, output } => {
            let config = load_config(config_path, saves, output)?;
            let report = Monitor::new(config).tick();
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Monitor {
            saves,
            output,
            interval,
            events,
        } => {
            let mut config = load_config(config_path, saves, output)?;
            if let Some(secs) = interval {
                config.interval_secs = secs;
            }
            let interval = config.interval();
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
                .block_on(monitor(config, interval, events))
        }
    }
}
