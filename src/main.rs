//! Simulator control panel - terminal UI
//!
//! Generate synthetic movement simulations, replay recorded ones, and
//! manually inject single connection events against the simulator backend,
//! with a live map and event feed.
//!
//! Module structure:
//! - `domain/` - Core data types (SimulationEvent, BtsLocation, ...)
//! - `io/` - External interfaces (backend HTTP client, NDJSON decoding, CSV export)
//! - `services/` - Session state (event log, map projection)
//! - `ui/` - Panel state, forms, input handling, rendering

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use simpanel::infra::Config;
use simpanel::io::backend::{BackendApi, BackendClient};
use simpanel::ui::{self, App, UiMsg};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Simulator control panel - generate, replay and manual connect
#[derive(Parser, Debug)]
#[command(name = "simpanel", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = Config::load_from_path(&config_path);

    let backend: Arc<dyn BackendApi> = Arc::new(BackendClient::new(&config)?);

    let (tx, rx) = mpsc::unbounded_channel();

    // Static reference geometry, fetched once; the panel starts without it
    // if the backend is unreachable.
    let bts_backend = backend.clone();
    let bts_tx = tx.clone();
    tokio::spawn(async move {
        let result = bts_backend.bts_locations().await.map_err(|e| e.to_string());
        let _ = bts_tx.send(UiMsg::Bts(result));
    });

    let app = App::new(&config, backend, tx);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend_term = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_term)?;

    let result = ui::run(&mut terminal, app, rx).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}
