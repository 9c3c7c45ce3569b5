// Screen state machine for the interactive UI
// Pure: key presses and search completions go in, actions for the runtime come out.
// Spawning searches, persisting results, quitting and suspending happen in `tui`.

pub mod details;
pub mod results;
pub mod search;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::domain::{FlightOffer, SearchRequest};
use crate::provider::SearchError;
use crate::render::ROUTE_SEPARATOR;

pub use details::DetailsView;
pub use results::ResultsView;
pub use search::{FormEvent, SearchForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Search,
    Results,
    Details,
}

/// Side effect requested from the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Search(SearchRequest),
    Quit,
    Suspend,
}

pub struct App {
    pub screen: Screen,
    pub search: SearchForm,
    pub results: ResultsView,
    pub details: Option<DetailsView>,
    pub status: Option<String>,
    adults: u32,
    currency: String,
    max_results: Option<u32>,
}

impl App {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            screen: Screen::Search,
            search: SearchForm::new(),
            results: ResultsView::default(),
            details: None,
            status: None,
            adults: config.adults.max(1),
            currency: config.currency.clone(),
            max_results: (config.max_results > 0).then_some(config.max_results),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.search.loading
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => return Action::Quit,
            (KeyCode::Char('z'), KeyModifiers::CONTROL) => return Action::Suspend,
            _ => {}
        }

        match self.screen {
            Screen::Search => self.handle_search_key(key),
            Screen::Results => self.handle_results_key(key),
            Screen::Details => self.handle_details_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Action {
        match self.search.handle_key(key) {
            FormEvent::Handled => Action::None,
            FormEvent::Submit => self.submit(),
        }
    }

    fn submit(&mut self) -> Action {
        // At most one search in flight; later submits are dropped, not queued
        if self.search.loading {
            debug!("search already running, ignoring submit");
            return Action::None;
        }

        match self
            .search
            .build_request(self.adults, &self.currency, self.max_results)
        {
            Ok(request) => {
                info!(
                    origin = %request.origin,
                    destination = %request.destination,
                    date = %request.depart_date_string(),
                    "starting search"
                );
                self.search.loading = true;
                self.search.error = None;
                self.status = Some(format!(
                    "Searching flights {}{}{}...",
                    request.origin, ROUTE_SEPARATOR, request.destination
                ));
                Action::Search(request)
            }
            Err(err) => {
                self.search.error = Some(err.to_string());
                Action::None
            }
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Esc => self.screen = Screen::Search,
            KeyCode::Up | KeyCode::Char('k') => self.results.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.results.select_next(),
            KeyCode::Enter => {
                if let Some(index) = self.results.selected() {
                    self.select_offer(index);
                }
            }
            _ => {}
        }
        Action::None
    }

    fn handle_details_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Char('b') | KeyCode::Esc => self.screen = Screen::Results,
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(details) = self.details.as_mut() {
                    details.scroll_up();
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(details) = self.details.as_mut() {
                    details.scroll_down();
                }
            }
            _ => {}
        }
        Action::None
    }

    /// Opens the details of the offer at `index`; an index outside the results is ignored.
    pub fn select_offer(&mut self, index: usize) {
        let Some(offer) = self.results.offer_at(index) else {
            return;
        };
        self.details = Some(DetailsView::new(offer.clone()));
        self.screen = Screen::Details;
    }

    /// Applies the single completion message of an in-flight search.
    pub fn handle_search_result(&mut self, result: Result<Vec<FlightOffer>, SearchError>) {
        self.search.loading = false;

        match result {
            Ok(offers) => {
                info!(count = offers.len(), "search finished");
                self.results = ResultsView::new(offers);
                self.details = None;
                self.search.error = None;
                self.status = Some(if self.results.is_empty() {
                    "No offers found".to_string()
                } else {
                    format!("{} offers", self.results.rows().len())
                });
                self.screen = Screen::Results;
            }
            Err(err) => {
                info!(error = %err, "search failed");
                self.search.error = Some(err.to_string());
                self.status = None;
                self.screen = Screen::Search;
            }
        }
    }
}
