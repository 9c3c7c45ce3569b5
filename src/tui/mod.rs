//! Interactive terminal runtime
//!
//! Architecture:
//! - One event loop owns the terminal and all `App` state
//! - `tokio::select!` over terminal events, search completions and a redraw tick
//! - Each search runs in its own task and reports back once over an mpsc channel

pub mod ui;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::{Action, App};
use crate::config::AppConfig;
use crate::domain::{FlightOffer, SearchRequest};
use crate::provider::{FlightProvider, SearchError};
use crate::store::{JsonStore, LAST_OFFERS_KEY};

type Tui = Terminal<CrosstermBackend<Stdout>>;
type SearchOutcome = Result<Vec<FlightOffer>, SearchError>;

const TICK_MS: u64 = 250;

fn enter_terminal() -> io::Result<()> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)
}

fn leave_terminal(terminal: &mut Tui) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

/// Run the TUI application until the user quits.
pub async fn run(
    config: &AppConfig,
    provider: Arc<dyn FlightProvider>,
    store: JsonStore,
) -> Result<()> {
    enter_terminal().context("failed to prepare terminal")?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    let mut app = App::new(config);
    info!(provider = provider.name(), "starting interactive session");

    let result = run_loop(&mut terminal, &mut app, provider, &store).await;

    leave_terminal(&mut terminal).context("failed to restore terminal")?;

    result
}

async fn run_loop(
    terminal: &mut Tui,
    app: &mut App,
    provider: Arc<dyn FlightProvider>,
    store: &JsonStore,
) -> Result<()> {
    let (result_tx, mut result_rx) = mpsc::channel::<SearchOutcome>(1);
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(TICK_MS));

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        let action = tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) => app.handle_key(key),
                // Resize and friends only need the redraw at the top of the loop
                Some(Ok(_)) => Action::None,
                Some(Err(e)) => return Err(e).context("failed to read terminal event"),
                None => Action::Quit,
            },
            Some(outcome) = result_rx.recv() => {
                let succeeded = outcome.is_ok();
                app.handle_search_result(outcome);
                if succeeded {
                    persist_offers(store, app.results.offers());
                }
                Action::None
            },
            _ = tick.tick() => Action::None,
        };

        match action {
            Action::None => {}
            Action::Quit => break,
            Action::Search(request) => {
                spawn_search(Arc::clone(&provider), request, result_tx.clone());
            }
            Action::Suspend => suspend(terminal)?,
        }
    }

    info!("interactive session finished");
    Ok(())
}

/// Runs one provider call off the UI loop and sends back exactly one outcome.
pub fn spawn_search(
    provider: Arc<dyn FlightProvider>,
    request: SearchRequest,
    result_tx: mpsc::Sender<SearchOutcome>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = provider.search(&request).await;
        if result_tx.send(outcome).await.is_err() {
            debug!("UI closed before the search finished");
        }
    })
}

/// Saves the latest results; failures are logged and never reach the user.
pub fn persist_offers(store: &JsonStore, offers: &[FlightOffer]) {
    match store.write(LAST_OFFERS_KEY, &offers) {
        Ok(()) => debug!(count = offers.len(), "persisted offers"),
        Err(e) => warn!(error = %e, "failed to persist offers"),
    }
}

#[cfg(unix)]
fn suspend(terminal: &mut Tui) -> Result<()> {
    leave_terminal(terminal)?;
    signal_hook::low_level::raise(signal_hook::consts::SIGTSTP)
        .context("failed to suspend")?;

    // Back from SIGCONT
    enter_terminal()?;
    terminal.clear()?;
    Ok(())
}

#[cfg(not(unix))]
fn suspend(_terminal: &mut Tui) -> Result<()> {
    Ok(())
}
