// Details screen state: one captured offer, pre-rendered into text lines

use crate::domain::FlightOffer;
use crate::render::{detail_header, detail_lines};

#[derive(Debug, Clone)]
pub struct DetailsView {
    pub offer: FlightOffer,
    pub header: String,
    pub lines: Vec<String>,
    pub scroll: u16,
}

impl DetailsView {
    pub fn new(offer: FlightOffer) -> Self {
        let header = detail_header(&offer);
        let lines = detail_lines(&offer);
        Self {
            offer,
            header,
            lines,
            scroll: 0,
        }
    }

    pub fn scroll_down(&mut self) {
        let max = self.lines.len().saturating_sub(1) as u16;
        self.scroll = (self.scroll + 1).min(max);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }
}
