//! Destination discovery: "origin → anywhere" searches over a rolling window.
//!
//! The provider may return quotes anywhere inside the requested window, so a
//! round keeps only departures that are already biddable (on/before the anchor
//! month), applies the optional region restriction, and collapses candidates
//! sharing a destination coordinate.
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::constants::{DISCOVERY_DESTINATION, DISCOVERY_TRIP_TYPE};
use crate::place::{Place, PlaceCatalog};
use crate::quote::Quote;

/// Wire query sent to the flight-search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryQuery {
    /// Origin entity id, empty at session start when no origin is known.
    pub from: String,
    pub to: String,
    pub trip_type: String,
    pub month: u32,
    pub year: i32,
    pub end_month: u32,
    pub end_year: i32,
}

impl DiscoveryQuery {
    /// Build the query for a window starting at `anchor`'s month.
    #[must_use]
    pub fn new(origin: Option<&Place>, anchor: NaiveDate, window_months: u32) -> Self {
        let (end_year, end_month) = add_months(anchor.year(), anchor.month(), window_months);
        Self {
            from: origin.map(|place| place.entity_id.clone()).unwrap_or_default(),
            to: DISCOVERY_DESTINATION.to_string(),
            trip_type: DISCOVERY_TRIP_TYPE.to_string(),
            month: anchor.month(),
            year: anchor.year(),
            end_month,
            end_year,
        }
    }
}

/// Shift a (year, 1-based month) pair forward by `months`.
fn add_months(year: i32, month: u32, months: u32) -> (i32, u32) {
    let index = i64::from(year) * 12 + i64::from(month) - 1 + i64::from(months);
    let year = i32::try_from(index.div_euclid(12)).unwrap_or(i32::MAX);
    let month = u32::try_from(index.rem_euclid(12)).unwrap_or(0) + 1;
    (year, month)
}

/// Provider response: either quotes or an error payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Quotes { quotes: Vec<Quote> },
    Error { error: String },
}

/// Transport-level provider failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("flight search failed: {0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Why a discovery round produced nothing to play.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("provider reported: {0}")]
    Rejected(String),
    #[error("no flights left after filtering")]
    NoFlights,
}

/// External flight-search provider.
#[async_trait]
pub trait FlightSearch: Send + Sync {
    /// Run an indicative "origin → anywhere" search.
    async fn search(&self, query: &DiscoveryQuery) -> Result<SearchResponse, ProviderError>;
}

#[async_trait]
impl<T: FlightSearch + ?Sized> FlightSearch for Arc<T> {
    async fn search(&self, query: &DiscoveryQuery) -> Result<SearchResponse, ProviderError> {
        (**self).search(query).await
    }
}

/// Quotes that survived a discovery round, one per destination coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    quotes: Vec<Quote>,
}

impl CandidateSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self { quotes: Vec::new() }
    }

    /// Collapse quotes sharing a destination coordinate; first seen wins.
    #[must_use]
    pub fn dedup(quotes: impl IntoIterator<Item = Quote>) -> Self {
        let mut seen = HashSet::new();
        let quotes = quotes
            .into_iter()
            .filter(|quote| seen.insert(quote.destination().coordinates.dedup_key()))
            .collect();
        Self { quotes }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    #[must_use]
    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    /// Keep only quotes matching `keep`.
    #[must_use]
    pub fn retain(mut self, keep: impl FnMut(&Quote) -> bool) -> Self {
        self.quotes.retain(keep);
        self
    }

    #[must_use]
    pub fn into_quotes(self) -> Vec<Quote> {
        self.quotes
    }
}

/// Whether a departure falls on or before the anchor's month.
#[must_use]
pub fn is_biddable(depart: NaiveDate, anchor: NaiveDate) -> bool {
    (depart.year(), depart.month()) <= (anchor.year(), anchor.month())
}

/// Turn a raw provider quote list into a candidate set.
///
/// Order: date filter, region filter, coordinate dedup.
///
/// # Errors
///
/// Returns [`DiscoveryError::NoFlights`] when nothing survives.
pub fn refine(
    quotes: Vec<Quote>,
    anchor: NaiveDate,
    region: Option<&str>,
    catalog: Option<&dyn PlaceCatalog>,
) -> Result<CandidateSet, DiscoveryError> {
    let received = quotes.len();
    let biddable = quotes
        .into_iter()
        .filter(|quote| is_biddable(quote.depart(), anchor));
    let candidates = match region {
        Some(region) => CandidateSet::dedup(
            biddable.filter(|quote| quote.destination().in_region(region, catalog)),
        ),
        None => CandidateSet::dedup(biddable),
    };
    log::debug!(
        "discovery refined {received} quotes to {} candidates (anchor {anchor})",
        candidates.len()
    );
    if candidates.is_empty() {
        return Err(DiscoveryError::NoFlights);
    }
    Ok(candidates)
}

/// Discovery service bound to a provider and the game's region restriction.
pub struct DestinationDiscovery<F> {
    provider: F,
    window_months: u32,
    region: Option<String>,
    catalog: Option<Arc<dyn PlaceCatalog + Send + Sync>>,
}

impl<F: FlightSearch> DestinationDiscovery<F> {
    #[must_use]
    pub const fn new(provider: F, window_months: u32) -> Self {
        Self {
            provider,
            window_months,
            region: None,
            catalog: None,
        }
    }

    /// Restrict destinations to `region`; the catalog resolves deep ancestry.
    #[must_use]
    pub fn with_region(
        mut self,
        region: Option<String>,
        catalog: Option<Arc<dyn PlaceCatalog + Send + Sync>>,
    ) -> Self {
        self.region = region;
        self.catalog = catalog;
        self
    }

    /// Resolve region ancestry through `catalog`, beyond the directly
    /// attached parent and country ids.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn PlaceCatalog + Send + Sync>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub const fn provider(&self) -> &F {
        &self.provider
    }

    /// Search from `origin` for the window anchored at `anchor`.
    ///
    /// # Errors
    ///
    /// Provider failures, provider error payloads, and empty results all
    /// surface as a [`DiscoveryError`]; none are retried.
    pub async fn discover(
        &self,
        origin: Option<&Place>,
        anchor: NaiveDate,
    ) -> Result<CandidateSet, DiscoveryError> {
        let query = DiscoveryQuery::new(origin, anchor, self.window_months);
        match self.provider.search(&query).await? {
            SearchResponse::Quotes { quotes } => refine(
                quotes,
                anchor,
                self.region.as_deref(),
                self.catalog
                    .as_deref()
                    .map(|catalog| catalog as &dyn PlaceCatalog),
            ),
            SearchResponse::Error { error } => {
                log::warn!("flight search from '{}' rejected: {error}", query.from);
                Err(DiscoveryError::Rejected(error))
            }
        }
    }
}
