//! hbscan - browse and search the hospital directory from a terminal
//!
//! Built with Ratatui and crossterm.

mod app;
mod config;
mod handlers;
mod ui;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use hbscan_core::{FileStore, Navigator};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use app::{App, AppState};
use config::Config;

/// hbscan - browse and search the hospital directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory service API base URL (overrides config and environment)
    #[arg(short, long, value_name = "URL")]
    api: Option<String>,

    /// Directory for search history and settings (overrides config)
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hbscan=info".parse()?))
        .with_writer(std::io::stderr) // Write logs to stderr to not interfere with TUI
        .init();

    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    tracing::info!("Starting hbscan");

    let mut config = Config::load(args.config)?;
    config.apply_overrides(
        std::env::var(config::API_BASE_URL_ENV).ok(),
        args.api,
        args.data_dir,
    );
    tracing::info!("API base URL: {}", config.api_base_url);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let gateway = config.gateway()?;
    let store = FileStore::new(config.resolved_data_dir()?);
    tracing::info!("Data directory: {}", store.dir().display());

    let navigator = Navigator::mount(Arc::new(gateway), Arc::new(store));
    let mut app = App::new(navigator);
    app.start().await;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app, config.task_refresh_interval()).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    task_refresh: Duration,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        // Poll for events with timeout for smooth updates
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handlers::handle_key(app, key).await {
                    break;
                }
            }
        }

        // Keep the task tab current while it is open
        if app.tasks_due(task_refresh) {
            app.refresh_tasks().await;
        }

        // Check if we should quit
        if matches!(app.state, AppState::Quit) {
            break;
        }
    }

    Ok(())
}
