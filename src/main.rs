mod app;
mod backoff;
mod config;
mod error;
mod feed;
mod history;
mod logging;
mod models;
mod theme;
mod ui;
mod view;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tracing::{info, warn};

use crate::app::App;
use crate::config::Config;
use crate::feed::{FeedHandle, FeedListener, FEED_CHANNEL_CAPACITY};

/// Raw mode and the alternate screen, restored on every exit path including panics.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(
            io::stdout(),
            crossterm::terminal::EnterAlternateScreen,
            crossterm::event::EnableMouseCapture
        )?;
        Ok(TerminalGuard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::event::DisableMouseCapture,
            crossterm::cursor::Show
        );
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;
    logging::init_tracing(&config.log_file, &config.log_level)?;
    info!(endpoint = %config.endpoint, "starting finetune-monitor");

    let mut feed = FeedListener::from(&config).spawn();
    let outcome = run_ui(&config, &mut feed);

    if let Err(e) = feed.shutdown().await {
        warn!(error = %e, "metrics feed stopped with error");
    }
    info!("finetune-monitor exiting");
    outcome
}

fn run_ui(config: &Config, feed: &mut FeedHandle) -> Result<()> {
    let _guard = TerminalGuard::enter().context("failed to prepare terminal")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let mut app = App::new(config.endpoint.as_str());

    loop {
        // Apply feed events one at a time, redrawing after each state change.
        // Capped so a fast producer cannot starve input handling.
        for event in feed.drain_pending(FEED_CHANNEL_CAPACITY) {
            if app.apply(event) {
                terminal.draw(|f| ui::render(f, &app))?;
            }
        }

        app.tick();
        terminal.draw(|f| ui::render(f, &app))?;

        if event::poll(config.tick())? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            break
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    Ok(())
}
