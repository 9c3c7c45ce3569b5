// Results screen state: the last successful search and the table cursor

use ratatui::widgets::TableState;

use crate::domain::FlightOffer;
use crate::render::{offer_rows, OfferRow};

#[derive(Debug, Default)]
pub struct ResultsView {
    offers: Vec<FlightOffer>,
    rows: Vec<OfferRow>,
    pub table_state: TableState,
}

impl ResultsView {
    pub fn new(offers: Vec<FlightOffer>) -> Self {
        // Rows and offers share indices; offers without segments have no row
        let offers: Vec<FlightOffer> = offers
            .into_iter()
            .filter(|offer| !offer.segments.is_empty())
            .collect();
        let rows = offer_rows(&offers);

        let mut table_state = TableState::default();
        if !rows.is_empty() {
            table_state.select(Some(0));
        }

        Self {
            offers,
            rows,
            table_state,
        }
    }

    pub fn offers(&self) -> &[FlightOffer] {
        &self.offers
    }

    pub fn rows(&self) -> &[OfferRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn selected(&self) -> Option<usize> {
        self.table_state.selected()
    }

    pub fn offer_at(&self, index: usize) -> Option<&FlightOffer> {
        self.offers.get(index)
    }

    pub fn select_next(&mut self) {
        if let Some(current) = self.selected() {
            let last = self.rows.len().saturating_sub(1);
            self.table_state.select(Some((current + 1).min(last)));
        }
    }

    pub fn select_prev(&mut self) {
        if let Some(current) = self.selected() {
            self.table_state.select(Some(current.saturating_sub(1)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Money, Segment};
    use chrono::{TimeZone, Utc};

    fn offer(id: &str, with_segment: bool) -> FlightOffer {
        let segments = if with_segment {
            vec![Segment {
                from: "CPH".to_string(),
                to: "YYZ".to_string(),
                depart_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap(),
                arrive_at: Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).unwrap(),
                carrier: "AC".to_string(),
                flight_no: "AC883".to_string(),
                cabin: "ECONOMY".to_string(),
            }]
        } else {
            Vec::new()
        };
        FlightOffer {
            provider: "test".to_string(),
            offer_id: id.to_string(),
            total_price: Money {
                amount: 61200,
                currency: "CAD".to_string(),
            },
            segments,
        }
    }

    #[test]
    fn test_cursor_is_clamped() {
        let mut view = ResultsView::new(vec![offer("a", true), offer("b", true)]);
        assert_eq!(view.selected(), Some(0));

        view.select_prev();
        assert_eq!(view.selected(), Some(0));
        view.select_next();
        view.select_next();
        assert_eq!(view.selected(), Some(1));
    }

    #[test]
    fn test_empty_view_has_no_cursor() {
        let mut view = ResultsView::new(Vec::new());
        assert!(view.is_empty());
        view.select_next();
        assert_eq!(view.selected(), None);
    }

    #[test]
    fn test_rows_line_up_with_offers() {
        let view = ResultsView::new(vec![offer("a", false), offer("b", true)]);
        assert_eq!(view.rows().len(), 1);
        assert_eq!(view.offer_at(0).unwrap().offer_id, "b");
        assert!(view.offer_at(1).is_none());
    }
}
