// Search screen state: three text fields plus the in-flight flag

use crossterm::event::{KeyCode, KeyEvent};
use tui_textarea::{Input, TextArea};

use crate::domain::SearchRequest;
use crate::provider::SearchError;

pub const FIELD_LABELS: [&str; 3] = ["From", "To", "Depart"];
const FIELD_PLACEHOLDERS: [&str; 3] = [
    "Source IATA (e.g. CPH)",
    "Destination IATA (e.g. YYZ)",
    "Departure date (YYYY-MM-DD)",
];

/// What a key press meant to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    Submit,
    Handled,
}

pub struct SearchForm {
    pub fields: [TextArea<'static>; 3],
    pub focus: usize,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for SearchForm {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchForm {
    pub fn new() -> Self {
        let fields = FIELD_PLACEHOLDERS.map(|placeholder| {
            let mut field = TextArea::default();
            field.set_placeholder_text(placeholder);
            field
        });

        Self {
            fields,
            focus: 0,
            loading: false,
            error: None,
        }
    }

    pub fn value(&self, index: usize) -> String {
        self.fields
            .get(index)
            .map(|field| field.lines().join(""))
            .unwrap_or_default()
    }

    pub fn set_value(&mut self, index: usize, value: &str) {
        if let Some(field) = self.fields.get_mut(index) {
            *field = TextArea::from([value.to_string()]);
            field.set_placeholder_text(FIELD_PLACEHOLDERS[index]);
            field.move_cursor(tui_textarea::CursorMove::End);
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormEvent {
        match key.code {
            KeyCode::Enter => return FormEvent::Submit,
            KeyCode::Tab | KeyCode::Down => self.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.focus_prev(),
            // Fields stay read-only until the running search settles
            _ if self.loading => {}
            _ => {
                self.fields[self.focus].input(Input::from(key));
            }
        }
        FormEvent::Handled
    }

    /// Validates the three fields into a request carrying the configured defaults.
    pub fn build_request(
        &self,
        adults: u32,
        currency: &str,
        max_results: Option<u32>,
    ) -> Result<SearchRequest, SearchError> {
        let mut request =
            SearchRequest::new(&self.value(0), &self.value(1), &self.value(2), adults)?
                .with_currency(currency);
        if let Some(max) = max_results {
            request = request.with_max_results(max);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_focus_wraps_both_ways() {
        let mut form = SearchForm::new();
        assert_eq!(form.focus, 0);

        form.handle_key(press(KeyCode::BackTab));
        assert_eq!(form.focus, 2);
        form.handle_key(press(KeyCode::Tab));
        assert_eq!(form.focus, 0);
        form.handle_key(press(KeyCode::Down));
        form.handle_key(press(KeyCode::Down));
        form.handle_key(press(KeyCode::Down));
        assert_eq!(form.focus, 0);
        form.handle_key(press(KeyCode::Up));
        assert_eq!(form.focus, 2);
    }

    #[test]
    fn test_typing_goes_to_focused_field() {
        let mut form = SearchForm::new();
        form.handle_key(press(KeyCode::Char('c')));
        form.handle_key(press(KeyCode::Char('p')));
        form.handle_key(press(KeyCode::Char('h')));
        form.handle_key(press(KeyCode::Tab));
        form.handle_key(press(KeyCode::Char('y')));

        assert_eq!(form.value(0), "cph");
        assert_eq!(form.value(1), "y");
        assert_eq!(form.value(2), "");
    }

    #[test]
    fn test_fields_are_read_only_while_loading() {
        let mut form = SearchForm::new();
        form.set_value(0, "CPH");
        form.loading = true;

        form.handle_key(press(KeyCode::Backspace));
        form.handle_key(press(KeyCode::Char('x')));
        form.handle_key(press(KeyCode::Tab));
        form.handle_key(press(KeyCode::Char('y')));
        assert_eq!(form.value(0), "CPH");
        assert_eq!(form.value(1), "");
        assert_eq!(form.focus, 1);

        form.loading = false;
        form.handle_key(press(KeyCode::Char('y')));
        assert_eq!(form.value(1), "y");
    }

    #[test]
    fn test_enter_submits() {
        let mut form = SearchForm::new();
        assert_eq!(form.handle_key(press(KeyCode::Enter)), FormEvent::Submit);
        assert_eq!(form.value(0), "");
    }

    #[test]
    fn test_build_request() {
        let mut form = SearchForm::new();
        form.set_value(0, "cph");
        form.set_value(1, "YYZ");
        form.set_value(2, "2025-06-01");

        let request = form.build_request(2, "cad", Some(5)).unwrap();
        assert_eq!(request.origin, "CPH");
        assert_eq!(request.adults, 2);
        assert_eq!(request.currency.as_deref(), Some("CAD"));
        assert_eq!(request.max_results, Some(5));

        form.set_value(2, "June 1st");
        assert!(matches!(
            form.build_request(1, "CAD", None),
            Err(SearchError::InvalidRequest(_))
        ));
    }
}
