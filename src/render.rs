// Presentation helpers: turn canonical offers into table rows and detail text
// Nothing here touches the terminal; the TUI and the one-shot CLI both build on it.

use std::collections::HashSet;

use chrono::Duration;

use crate::domain::{FlightOffer, Money, Segment};

pub const ROUTE_SEPARATOR: &str = " → ";
pub const ROW_TIME_FORMAT: &str = "%a, %b %-d, %-I:%M %p";
pub const DETAIL_DATE_FORMAT: &str = "%a, %d %b %Y";
pub const DETAIL_TIME_FORMAT: &str = "%H:%M UTC";

pub const TABLE_HEADERS: [&str; 6] = [
    "Route",
    "Departure Time",
    "Arrival Time",
    "Duration",
    "Price",
    "Carrier",
];

// One rendered results-table line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferRow {
    pub route: String,
    pub departure: String,
    pub arrival: String,
    pub duration: String,
    pub price: String,
    pub carriers: String,
}

impl OfferRow {
    pub fn cells(&self) -> [&str; 6] {
        [
            &self.route,
            &self.departure,
            &self.arrival,
            &self.duration,
            &self.price,
            &self.carriers,
        ]
    }
}

pub fn empty_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

/// `"CPH → LHR → YYZ"`: first origin, then every destination.
pub fn route_line(segments: &[Segment]) -> String {
    let Some(first) = segments.first() else {
        return "-".to_string();
    };

    std::iter::once(empty_dash(&first.from))
        .chain(segments.iter().map(|s| empty_dash(&s.to)))
        .collect::<Vec<_>>()
        .join(ROUTE_SEPARATOR)
}

/// Hours and minutes only, dropping the zero unit. Negative input clamps to zero.
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    let (hours, minutes) = (minutes / 60, minutes % 60);

    match (hours, minutes) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

pub fn format_money(money: &Money) -> String {
    let sign = if money.amount < 0 { "-" } else { "" };
    let abs = money.amount.unsigned_abs();
    format!("{}{} {}.{:02}", sign, money.currency, abs / 100, abs % 100)
}

pub fn join_unique_carriers(segments: &[Segment]) -> String {
    let mut seen = HashSet::new();
    let carriers: Vec<&str> = segments
        .iter()
        .map(|s| s.carrier.trim())
        .filter(|c| !c.is_empty() && seen.insert(*c))
        .collect();

    if carriers.is_empty() {
        "-".to_string()
    } else {
        carriers.join(", ")
    }
}

/// Gaps between consecutive segments, one per connection.
pub fn layovers(segments: &[Segment]) -> Vec<Duration> {
    segments
        .windows(2)
        .map(|pair| pair[1].depart_at - pair[0].arrive_at)
        .collect()
}

// "2h 10m | 7h 5m | total 9h 15m"
fn duration_summary(segments: &[Segment]) -> String {
    let clamped: Vec<Duration> = segments
        .iter()
        .map(|s| s.duration().max(Duration::zero()))
        .collect();
    let total = clamped
        .iter()
        .fold(Duration::zero(), |acc, d| acc + *d);

    let parts: Vec<String> = clamped.iter().map(|d| format_duration(*d)).collect();
    format!("{} | total {}", parts.join(" | "), format_duration(total))
}

pub fn offer_row(offer: &FlightOffer) -> Option<OfferRow> {
    let departure = offer.first_departure()?;
    let arrival = offer.last_arrival()?;

    Some(OfferRow {
        route: route_line(&offer.segments),
        departure: departure.format(ROW_TIME_FORMAT).to_string(),
        arrival: arrival.format(ROW_TIME_FORMAT).to_string(),
        duration: duration_summary(&offer.segments),
        price: format_money(&offer.total_price),
        carriers: join_unique_carriers(&offer.segments),
    })
}

/// Table rows for a result set. Offers without segments have nothing to show and are skipped.
pub fn offer_rows(offers: &[FlightOffer]) -> Vec<OfferRow> {
    offers.iter().filter_map(offer_row).collect()
}

pub fn detail_header(offer: &FlightOffer) -> String {
    let date = offer
        .first_departure()
        .map(|d| d.format(DETAIL_DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Departure Date: {}      Price: {}",
        date,
        format_money(&offer.total_price)
    )
}

/// Itinerary timeline for the details pane, one string per line.
pub fn detail_lines(offer: &FlightOffer) -> Vec<String> {
    let mut lines = Vec::new();
    let gaps = layovers(&offer.segments);

    for (i, segment) in offer.segments.iter().enumerate() {
        if i != 0 {
            lines.push("│".to_string());
        }
        lines.push(format!(
            "○ {} {}",
            segment.depart_at.format(DETAIL_TIME_FORMAT),
            empty_dash(&segment.from)
        ));
        lines.push("│".to_string());
        lines.push(format!(
            "│ Travel Time: {}",
            format_duration(segment.duration())
        ));
        lines.push("│".to_string());
        lines.push(format!(
            "○ {} {}",
            segment.arrive_at.format(DETAIL_TIME_FORMAT),
            empty_dash(&segment.to)
        ));
        lines.push(format!(
            "│ {} · {} · {}",
            empty_dash(&segment.carrier),
            empty_dash(&segment.flight_no),
            empty_dash(&segment.cabin)
        ));

        if let Some(gap) = gaps.get(i) {
            lines.push("─".repeat(48));
            lines.push(format!(
                "{} layover • {}",
                format_duration(*gap),
                empty_dash(&segment.to)
            ));
            lines.push("─".repeat(48));
        }
    }

    lines
}
