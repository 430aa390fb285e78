//! End-of-game summary for the result screen.
use serde::{Deserialize, Serialize};

use crate::numbers::format_money;
use crate::session::{EndReason, GamePhase, GameSession};

/// One accepted leg as shown on the result screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSummary {
    pub from: String,
    pub to: String,
    pub price: f64,
    pub depart: chrono::NaiveDate,
}

/// Complete summary of a finished game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub ending: EndReason,
    pub headline: String,
    pub player_name: String,
    /// Stop names, origin first.
    pub stops: Vec<String>,
    pub legs: Vec<LegSummary>,
    pub stopovers: usize,
    pub budget_limit: f64,
    pub spent: f64,
    pub remaining: f64,
    pub distance_km: f64,
}

impl ResultSummary {
    /// e.g. `London → Paris → Tokyo`
    #[must_use]
    pub fn route(&self) -> String {
        self.stops.join(" → ")
    }
}

#[must_use]
pub fn headline(ending: EndReason, remaining: f64) -> String {
    match ending {
        EndReason::Won => format!("Home again with {} to spare", format_money(remaining)),
        EndReason::OverBudget => format!("Over budget by {}", format_money(-remaining)),
        EndReason::NoFlights => "Stranded: no flights onward".to_string(),
    }
}

/// Summary of `session` once it has ended; `None` while still in play.
#[must_use]
pub fn result_summary(session: &GameSession) -> Option<ResultSummary> {
    let GamePhase::End(ending) = session.phase() else {
        return None;
    };
    let remaining = session.remaining();
    let legs = session
        .quotes_accepted()
        .iter()
        .map(|quote| LegSummary {
            from: quote.query.from.name.clone(),
            to: quote.query.to.name.clone(),
            price: quote.price.amount(),
            depart: quote.depart(),
        })
        .collect();
    Some(ResultSummary {
        ending,
        headline: headline(ending, remaining),
        player_name: session.player_name().to_string(),
        stops: session
            .itinerary()
            .iter()
            .map(|place| place.name.clone())
            .collect(),
        legs,
        stopovers: session.stopovers(),
        budget_limit: session.budget().limit(),
        spent: session.total_spent(),
        remaining,
        distance_km: session.distance_km(),
    })
}
