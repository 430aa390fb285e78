//! Priced legs returned by the flight-search provider.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::place::Place;

/// Route and dates a quote was priced for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteQuery {
    pub from: Place,
    pub to: Place,
    pub depart: NaiveDate,
    #[serde(
        default,
        rename = "return",
        skip_serializing_if = "Option::is_none"
    )]
    pub return_date: Option<NaiveDate>,
}

/// Indicative price. `raw` may be missing for unpriced quotes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Price {
    #[serde(default)]
    pub raw: Option<f64>,
    #[serde(default)]
    pub display: String,
}

impl Price {
    #[must_use]
    pub fn new(raw: f64) -> Self {
        Self {
            raw: Some(raw),
            display: crate::numbers::format_money(raw),
        }
    }

    /// Amount charged against the budget; unpriced quotes cost nothing.
    #[must_use]
    pub fn amount(&self) -> f64 {
        self.raw.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub query: QuoteQuery,
    pub price: Price,
}

impl Quote {
    #[must_use]
    pub fn new(from: Place, to: Place, depart: NaiveDate, price: Price) -> Self {
        Self {
            query: QuoteQuery {
                from,
                to,
                depart,
                return_date: None,
            },
            price,
        }
    }

    #[must_use]
    pub const fn destination(&self) -> &Place {
        &self.query.to
    }

    #[must_use]
    pub const fn depart(&self) -> NaiveDate {
        self.query.depart
    }

    /// Marker label shown on the map for this candidate.
    #[must_use]
    pub fn label(&self) -> String {
        if self.price.display.is_empty() {
            self.query.to.name.clone()
        } else {
            format!("{} · {}", self.query.to.name, self.price.display)
        }
    }
}
