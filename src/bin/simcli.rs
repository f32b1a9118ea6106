//! Headless companion to the panel
//!
//! Runs the backend operations from the command line and prints each
//! received record as one line. `generate --csv` writes the generated
//! stream to a CSV file instead of a live log, covering the download-based
//! flow.
//!
//! Usage:
//!   simcli generate --users 2 --events 5
//!   simcli generate --users 2 --events 5 --csv out.csv
//!   simcli replay recorded.csv
//!   simcli connect --imei 490154203237518 --x 12 --y 7 --keepalive
//!   simcli bts

use anyhow::Context;
use clap::{Parser, Subcommand};
use simpanel::domain::{ConnectRequest, SimulationEvent};
use simpanel::infra::Config;
use simpanel::io::backend::{BackendApi, BackendClient};
use simpanel::io::export::csv_string;
use simpanel::ui::forms::now_timestamp;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "simcli", version, about = "Simulator backend command line client")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Backend base URL (overrides config and BACKEND_URL)
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a synthetic simulation and stream its events
    Generate {
        #[arg(long, default_value = "1")]
        users: u32,
        #[arg(long, default_value = "10")]
        events: u32,
        /// Write the stream to a CSV file instead of stdout lines only
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Upload a recorded CSV and stream the replayed events
    Replay {
        /// CSV file to upload
        file: PathBuf,
    },
    /// Send a single manual connect
    Connect {
        #[arg(long)]
        imei: String,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        /// Defaults to the current time
        #[arg(long)]
        timestamp: Option<String>,
        #[arg(long)]
        keepalive: bool,
    },
    /// Fetch and print BTS locations
    Bts,
}

fn print_event(event: &SimulationEvent) {
    let class = event.class();
    let note = event
        .response
        .error
        .as_deref()
        .or(event.response.detail.as_deref())
        .unwrap_or("");
    println!(
        "{} {} {} {} {} {}",
        event.timestamp,
        event.imei,
        event.x,
        event.y,
        class.as_str(),
        note
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();

    let config_path = Config::resolve_config_path(args.config.as_deref());
    let mut config = Config::load_from_path(&config_path);
    if let Some(url) = &args.base_url {
        config = config.with_base_url(url);
    }

    let client = BackendClient::new(&config)?;

    match args.command {
        Command::Generate { users, events, csv } => {
            let mut received: Vec<SimulationEvent> = Vec::new();
            let mut sink = |event: SimulationEvent| {
                print_event(&event);
                received.push(event);
            };
            let summary = client
                .generate(users, events, &mut sink)
                .await
                .context("generate failed")?;

            if summary.malformed > 0 {
                eprintln!("{} malformed lines skipped", summary.malformed);
            }
            info!(records = summary.records, "generate_complete");

            if let Some(path) = csv {
                std::fs::write(&path, csv_string(&received))
                    .with_context(|| format!("write {}", path.display()))?;
                println!("wrote {} ({} rows)", path.display(), received.len());
            }
        }
        Command::Replay { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "replay.csv".to_string());

            let mut sink = |event: SimulationEvent| print_event(&event);
            let summary = client
                .replay(&file_name, bytes, &mut sink)
                .await
                .context("replay failed")?;

            if summary.malformed > 0 {
                eprintln!("{} malformed lines skipped", summary.malformed);
            }
            info!(records = summary.records, "replay_complete");
        }
        Command::Connect { imei, x, y, timestamp, keepalive } => {
            let req = ConnectRequest {
                imei,
                x,
                y,
                timestamp: timestamp.unwrap_or_else(now_timestamp),
                keepalive,
            };
            let event = client.connect_manual(&req).await.context("connect failed")?;
            print_event(&event);
        }
        Command::Bts => {
            let locations = client.bts_locations().await.context("BTS fetch failed")?;
            for bts in locations {
                println!("{} {} {}", bts.bts_id, bts.x, bts.y);
            }
        }
    }

    Ok(())
}
