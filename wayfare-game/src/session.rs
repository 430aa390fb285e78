//! Game session state machine.
//!
//! A session moves `Start → Playing → End{reason}` and back to `Playing` on
//! restart. Transitions are plain methods over the owned session record; each
//! returns a [`Transition`] describing the map commands, events, discovery
//! request, and leaderboard submission the caller must carry out. Nothing here
//! performs I/O, so every rule can be exercised without a renderer or network.
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::achievements::{self, Notification};
use crate::budget::BudgetTracker;
use crate::config::GameConfig;
use crate::discovery::{CandidateSet, DiscoveryError, DiscoveryQuery};
use crate::events::{EventId, EventKind, GameEvent};
use crate::geo;
use crate::leaderboard::WinSubmission;
use crate::map::{LineHandle, MapCommand, MarkerHandle};
use crate::place::Place;
use crate::progress;
use crate::quote::Quote;

/// Identifier of the live discovery round. Only the response carrying the
/// current token may render candidates.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RoundToken(u64);

impl RoundToken {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Back at the origin city without exceeding the budget.
    Won,
    OverBudget,
    /// Nowhere left to fly: provider failure or every candidate filtered out.
    NoFlights,
}

impl EndReason {
    #[must_use]
    pub const fn is_win(self) -> bool {
        matches!(self, Self::Won)
    }
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Won => write!(f, "won"),
            Self::OverBudget => write!(f, "over_budget"),
            Self::NoFlights => write!(f, "no_flights"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", content = "reason", rename_all = "snake_case")]
pub enum GamePhase {
    Start,
    Playing,
    End(EndReason),
}

impl GamePhase {
    #[must_use]
    pub const fn is_over(self) -> bool {
        matches!(self, Self::End(_))
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Playing => write!(f, "playing"),
            Self::End(reason) => write!(f, "end ({reason})"),
        }
    }
}

/// Where the current discovery round stands, for pending/stalled UI states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStatus {
    Idle,
    Pending(RoundToken),
    /// Still waiting, past the stall threshold.
    Stalled(RoundToken),
    Ready,
}

/// A clickable quote currently on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub marker: MarkerHandle,
    pub quote: Quote,
}

/// Discovery the caller must run and feed back through
/// [`GameSession::resolve_discovery`].
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryRequest {
    pub token: RoundToken,
    pub origin: Option<Place>,
    pub anchor: NaiveDate,
}

impl DiscoveryRequest {
    #[must_use]
    pub fn query(&self, window_months: u32) -> DiscoveryQuery {
        DiscoveryQuery::new(self.origin.as_ref(), self.anchor, window_months)
    }
}

/// Side effects produced by one transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub commands: Vec<MapCommand>,
    pub events: Vec<GameEvent>,
    pub request: Option<DiscoveryRequest>,
    pub submission: Option<WinSubmission>,
}

impl Transition {
    #[must_use]
    pub fn has_event(&self, kind: EventKind) -> bool {
        self.events.iter().any(|event| event.kind == kind)
    }
}

/// Result of feeding a discovery response back into the session.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// The response belongs to an abandoned round and was dropped.
    Stale,
    Ready(Transition),
    DeadEnd(Transition),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a player name is required to start")]
    EmptyPlayerName,
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("the game has not started yet")]
    NotStarted,
    #[error("no move is possible in phase {0}")]
    NotPlaying(GamePhase),
    #[error("{0} is not a current candidate")]
    UnknownMarker(MarkerHandle),
}

/// Serializable copy of a session's durable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub config: GameConfig,
    pub origin: Place,
    pub player_name: String,
    pub phase: GamePhase,
    pub itinerary: Vec<Place>,
    pub spend: Vec<f64>,
    pub quotes_accepted: Vec<Quote>,
    pub anchor: NaiveDate,
    pub start_anchor: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    config: GameConfig,
    phase: GamePhase,
    origin: Place,
    player_name: String,
    itinerary: Vec<Place>,
    budget: BudgetTracker,
    quotes_accepted: Vec<Quote>,
    candidates: Vec<Candidate>,
    stop_markers: Vec<MarkerHandle>,
    leg_lines: Vec<LineHandle>,
    round: RoundToken,
    discovery: DiscoveryStatus,
    start_anchor: NaiveDate,
    anchor: NaiveDate,
    next_handle: u64,
    event_seq: u32,
    notification: Option<Notification>,
}

impl GameSession {
    /// New session waiting in `Start` at `origin`.
    ///
    /// The first departure anchor is the configured start date, or today.
    #[must_use]
    pub fn new(config: GameConfig, origin: Place) -> Self {
        let start_anchor = config
            .start_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let budget = BudgetTracker::new(config.budget_limit);
        Self {
            config,
            phase: GamePhase::Start,
            itinerary: vec![origin.clone()],
            origin,
            player_name: String::new(),
            budget,
            quotes_accepted: Vec::new(),
            candidates: Vec::new(),
            stop_markers: Vec::new(),
            leg_lines: Vec::new(),
            round: RoundToken::default(),
            discovery: DiscoveryStatus::Idle,
            start_anchor,
            anchor: start_anchor,
            next_handle: 0,
            event_seq: 0,
            notification: None,
        }
    }

    /// Rebuild a session from a snapshot. Nothing is drawn until
    /// [`GameSession::resume`] is called.
    #[must_use]
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        let budget = BudgetTracker::with_spend(snapshot.config.budget_limit, snapshot.spend);
        let itinerary = if snapshot.itinerary.is_empty() {
            vec![snapshot.origin.clone()]
        } else {
            snapshot.itinerary
        };
        Self {
            config: snapshot.config,
            phase: snapshot.phase,
            origin: snapshot.origin,
            player_name: snapshot.player_name,
            itinerary,
            budget,
            quotes_accepted: snapshot.quotes_accepted,
            candidates: Vec::new(),
            stop_markers: Vec::new(),
            leg_lines: Vec::new(),
            round: RoundToken::default(),
            discovery: DiscoveryStatus::Idle,
            start_anchor: snapshot.start_anchor,
            anchor: snapshot.anchor,
            next_handle: 0,
            event_seq: 0,
            notification: None,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            config: self.config.clone(),
            origin: self.origin.clone(),
            player_name: self.player_name.clone(),
            phase: self.phase,
            itinerary: self.itinerary.clone(),
            spend: self.budget.spend().to_vec(),
            quotes_accepted: self.quotes_accepted.clone(),
            anchor: self.anchor,
            start_anchor: self.start_anchor,
        }
    }

    // Transitions -----------------------------------------------------------

    /// `Start → Playing`. Places the camera on the origin and issues the first
    /// discovery round.
    ///
    /// # Errors
    ///
    /// Fails without changing state if the name is blank or the game already
    /// started.
    pub fn start(&mut self, player_name: &str) -> Result<Transition, SessionError> {
        if self.phase != GamePhase::Start {
            return Err(SessionError::AlreadyStarted);
        }
        let name = player_name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyPlayerName);
        }
        self.player_name = name.to_string();
        self.phase = GamePhase::Playing;

        let mut transition = Transition::default();
        self.place_camera(&mut transition);
        let origin = self.origin.clone();
        self.draw_stop(&mut transition, &origin);
        self.emit(
            &mut transition,
            EventKind::SessionStarted,
            serde_json::json!({
                "player": self.player_name,
                "origin": self.origin.entity_id,
                "budget_limit": self.budget.limit(),
                "anchor": self.anchor,
            }),
        );
        log::info!(
            "{} starts from {} with {}",
            self.player_name,
            self.origin.name,
            crate::numbers::format_money(self.budget.limit())
        );
        self.begin_round(&mut transition);
        Ok(transition)
    }

    /// Feed a discovery response back in.
    ///
    /// Responses for anything but the live round are dropped. An error or an
    /// empty set (after the forward-progress filter) ends the game.
    pub fn resolve_discovery(
        &mut self,
        token: RoundToken,
        result: Result<CandidateSet, DiscoveryError>,
    ) -> RoundOutcome {
        let live = matches!(
            self.discovery,
            DiscoveryStatus::Pending(current) | DiscoveryStatus::Stalled(current) if current == token
        );
        if self.phase != GamePhase::Playing || !live {
            log::debug!(
                "dropping discovery round {} (live round {})",
                token.value(),
                self.round.value()
            );
            return RoundOutcome::Stale;
        }

        let mut transition = Transition::default();
        let (candidates, failure) = match result {
            Ok(set) => match progress::previous_stop(&self.itinerary) {
                Some(previous) => (progress::filter(set, previous), None),
                None => (set, None),
            },
            Err(err) => {
                log::warn!("discovery round {} failed: {err}", token.value());
                (CandidateSet::empty(), Some(err.to_string()))
            }
        };

        if candidates.is_empty() {
            let detail = failure.unwrap_or_else(|| DiscoveryError::NoFlights.to_string());
            self.finish(EndReason::NoFlights, Some(detail), &mut transition);
            return RoundOutcome::DeadEnd(transition);
        }

        for quote in candidates.into_quotes() {
            let marker = self.next_marker();
            transition.commands.push(MapCommand::AddMarker {
                handle: marker,
                place: quote.destination().clone(),
                label: quote.label(),
                candidate: true,
            });
            self.candidates.push(Candidate { marker, quote });
        }
        self.discovery = DiscoveryStatus::Ready;
        self.emit(
            &mut transition,
            EventKind::CandidatesReady,
            serde_json::json!({
                "count": self.candidates.len(),
                "from": self.current_location().entity_id,
            }),
        );
        RoundOutcome::Ready(transition)
    }

    /// Player clicked a candidate marker.
    ///
    /// # Errors
    ///
    /// Fails without changing state outside `Playing` or for a marker that is
    /// not a live candidate.
    pub fn select(&mut self, marker: MarkerHandle) -> Result<Transition, SessionError> {
        self.ensure_playing()?;
        let quote = self
            .candidates
            .iter()
            .find(|candidate| candidate.marker == marker)
            .map(|candidate| candidate.quote.clone())
            .ok_or(SessionError::UnknownMarker(marker))?;
        Ok(self.accept(quote))
    }

    /// Back to a single-origin itinerary, re-entering `Playing` with the same
    /// player. Any in-flight discovery round is invalidated.
    ///
    /// # Errors
    ///
    /// Fails if the game never started.
    pub fn restart(&mut self) -> Result<Transition, SessionError> {
        if self.phase == GamePhase::Start {
            return Err(SessionError::NotStarted);
        }
        let mut transition = Transition::default();
        self.clear_candidates(&mut transition);
        self.clear_route(&mut transition);

        self.itinerary = vec![self.origin.clone()];
        self.budget.reset();
        self.quotes_accepted.clear();
        self.notification = None;
        self.anchor = self.start_anchor;
        self.phase = GamePhase::Playing;

        self.emit(
            &mut transition,
            EventKind::SessionRestarted,
            serde_json::json!({ "player": self.player_name }),
        );
        self.place_camera(&mut transition);
        let origin = self.origin.clone();
        self.draw_stop(&mut transition, &origin);
        self.begin_round(&mut transition);
        Ok(transition)
    }

    /// Redraw a restored session and issue a fresh discovery round.
    ///
    /// # Errors
    ///
    /// Fails outside `Playing`.
    pub fn resume(&mut self) -> Result<Transition, SessionError> {
        self.ensure_playing()?;
        let mut transition = Transition::default();
        self.clear_candidates(&mut transition);
        self.clear_route(&mut transition);
        self.place_camera(&mut transition);
        let itinerary = self.itinerary.clone();
        for (idx, place) in itinerary.iter().enumerate() {
            if let Some(previous) = idx.checked_sub(1).and_then(|prev| itinerary.get(prev)) {
                self.draw_leg(&mut transition, previous, place);
            }
            self.draw_stop(&mut transition, place);
        }
        self.begin_round(&mut transition);
        Ok(transition)
    }

    /// Flag the live round as stalled; returns the event to surface once.
    pub fn mark_stalled(&mut self, token: RoundToken) -> Option<GameEvent> {
        if self.discovery != DiscoveryStatus::Pending(token) {
            return None;
        }
        self.discovery = DiscoveryStatus::Stalled(token);
        log::warn!("discovery round {} is taking a while", token.value());
        Some(self.event(
            EventKind::DiscoveryStalled,
            serde_json::json!({ "from": self.current_location().entity_id }),
        ))
    }

    /// Drop the milestone notification once its time is up.
    /// Returns true if one was cleared.
    pub fn expire_notification(&mut self, now: Instant) -> bool {
        if self
            .notification
            .as_ref()
            .is_some_and(|notice| notice.is_expired(now))
        {
            self.notification = None;
            return true;
        }
        false
    }

    // Queries ---------------------------------------------------------------

    #[must_use]
    pub const fn phase(&self) -> GamePhase {
        self.phase
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    #[must_use]
    pub const fn origin(&self) -> &Place {
        &self.origin
    }

    #[must_use]
    pub fn itinerary(&self) -> &[Place] {
        &self.itinerary
    }

    /// Where the player is now; the origin before the first leg.
    #[must_use]
    pub fn current_location(&self) -> &Place {
        self.itinerary.last().unwrap_or(&self.origin)
    }

    /// Cities visited beyond the origin.
    #[must_use]
    pub fn stopovers(&self) -> usize {
        self.itinerary.len().saturating_sub(1)
    }

    #[must_use]
    pub const fn budget(&self) -> &BudgetTracker {
        &self.budget
    }

    #[must_use]
    pub fn spend(&self) -> &[f64] {
        self.budget.spend()
    }

    #[must_use]
    pub fn total_spent(&self) -> f64 {
        self.budget.total()
    }

    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.budget.remaining()
    }

    #[must_use]
    pub fn quotes_accepted(&self) -> &[Quote] {
        &self.quotes_accepted
    }

    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Handles of the candidate markers currently on the map.
    #[must_use]
    pub fn viewing_markers(&self) -> Vec<MarkerHandle> {
        self.candidates.iter().map(|candidate| candidate.marker).collect()
    }

    #[must_use]
    pub const fn round(&self) -> RoundToken {
        self.round
    }

    #[must_use]
    pub const fn discovery_status(&self) -> DiscoveryStatus {
        self.discovery
    }

    /// Departure date the next discovery round is anchored at.
    #[must_use]
    pub const fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    /// Milestone notice still on screen at `now`.
    #[must_use]
    pub fn notification(&self, now: Instant) -> Option<&Notification> {
        self.notification
            .as_ref()
            .filter(|notice| !notice.is_expired(now))
    }

    /// Great-circle distance flown so far.
    #[must_use]
    pub fn distance_km(&self) -> f64 {
        let points: Vec<_> = self.itinerary.iter().map(|place| place.coordinates).collect();
        geo::path_length_km(&points)
    }

    // Internals -------------------------------------------------------------

    fn ensure_playing(&self) -> Result<(), SessionError> {
        if self.phase == GamePhase::Playing {
            Ok(())
        } else {
            Err(SessionError::NotPlaying(self.phase))
        }
    }

    fn accept(&mut self, quote: Quote) -> Transition {
        let mut transition = Transition::default();
        self.clear_candidates(&mut transition);
        self.discovery = DiscoveryStatus::Idle;

        let from = self.current_location().clone();
        let destination = quote.destination().clone();
        let total = self.budget.accept(&quote);
        self.itinerary.push(destination.clone());
        let depart = quote.depart();
        self.emit(
            &mut transition,
            EventKind::LegAccepted,
            serde_json::json!({
                "from": from.entity_id,
                "to": destination.entity_id,
                "price": quote.price.amount(),
                "total": total,
                "remaining": self.budget.remaining(),
                "depart": depart,
            }),
        );
        self.quotes_accepted.push(quote);
        self.draw_leg(&mut transition, &from, &destination);
        self.draw_stop(&mut transition, &destination);

        match self.terminal_reason(&destination) {
            Some(reason) => self.finish(reason, None, &mut transition),
            None => {
                self.raise_milestone(&mut transition);
                self.anchor = depart;
                self.begin_round(&mut transition);
            }
        }
        transition
    }

    /// Over budget is checked first so a pricey last leg home still loses.
    fn terminal_reason(&self, arrived: &Place) -> Option<EndReason> {
        if self.budget.is_over_budget() {
            return Some(EndReason::OverBudget);
        }
        if self.budget.remaining() >= 0.0 && arrived.same_city(&self.origin) {
            return Some(EndReason::Won);
        }
        None
    }

    fn raise_milestone(&mut self, transition: &mut Transition) {
        let Some(milestone) = achievements::reached(self.stopovers(), &self.config.milestones)
        else {
            return;
        };
        let notice = achievements::notify(milestone, Instant::now(), self.config.notification_ttl());
        self.emit(
            transition,
            EventKind::MilestoneReached,
            serde_json::json!({ "milestone": milestone, "label": notice.label }),
        );
        self.notification = Some(notice);
    }

    fn begin_round(&mut self, transition: &mut Transition) {
        self.clear_candidates(transition);
        self.round = self.round.next();
        self.discovery = DiscoveryStatus::Pending(self.round);
        let origin = self.current_location().clone();
        self.emit(
            transition,
            EventKind::DiscoveryIssued,
            serde_json::json!({
                "round": self.round.value(),
                "from": origin.entity_id,
                "anchor": self.anchor,
            }),
        );
        transition.request = Some(DiscoveryRequest {
            token: self.round,
            origin: Some(origin),
            anchor: self.anchor,
        });
    }

    fn finish(&mut self, reason: EndReason, detail: Option<String>, transition: &mut Transition) {
        self.clear_candidates(transition);
        // Any response still in flight now belongs to a dead round.
        self.round = self.round.next();
        self.discovery = DiscoveryStatus::Idle;
        self.phase = GamePhase::End(reason);
        transition.request = None;

        self.emit(
            transition,
            EventKind::GameEnded,
            serde_json::json!({
                "reason": reason,
                "detail": detail,
                "spent": self.budget.total(),
                "remaining": self.budget.remaining(),
                "stopovers": self.stopovers(),
            }),
        );
        log::info!(
            "{}'s game ended: {reason} after {} stopovers, spent {}",
            self.player_name,
            self.stopovers(),
            crate::numbers::format_money(self.budget.total())
        );
        if reason.is_win() {
            transition.submission = Some(WinSubmission::from_itinerary(
                &self.player_name,
                &self.itinerary,
            ));
        }
    }

    fn place_camera(&self, transition: &mut Transition) {
        transition
            .commands
            .push(MapCommand::FitToAddress(self.origin.name.clone()));
        transition
            .commands
            .push(MapCommand::PanTo(self.origin.coordinates));
        transition
            .commands
            .push(MapCommand::SetZoom(self.config.origin_zoom));
    }

    fn draw_stop(&mut self, transition: &mut Transition, place: &Place) {
        let handle = self.next_marker();
        self.stop_markers.push(handle);
        transition.commands.push(MapCommand::AddMarker {
            handle,
            place: place.clone(),
            label: place.name.clone(),
            candidate: false,
        });
    }

    fn draw_leg(&mut self, transition: &mut Transition, from: &Place, to: &Place) {
        self.next_handle += 1;
        let handle = LineHandle(self.next_handle);
        self.leg_lines.push(handle);
        transition.commands.push(MapCommand::AddLine {
            handle,
            points: vec![from.coordinates, to.coordinates],
        });
    }

    fn clear_candidates(&mut self, transition: &mut Transition) {
        if self.candidates.is_empty() {
            return;
        }
        let handles = self
            .candidates
            .drain(..)
            .map(|candidate| candidate.marker)
            .collect();
        transition.commands.push(MapCommand::ClearMarkers(handles));
    }

    fn clear_route(&mut self, transition: &mut Transition) {
        if !self.stop_markers.is_empty() {
            transition
                .commands
                .push(MapCommand::ClearMarkers(std::mem::take(&mut self.stop_markers)));
        }
        if !self.leg_lines.is_empty() {
            transition
                .commands
                .push(MapCommand::ClearLines(std::mem::take(&mut self.leg_lines)));
        }
    }

    fn next_marker(&mut self) -> MarkerHandle {
        self.next_handle += 1;
        MarkerHandle(self.next_handle)
    }

    /// Claim the next event id in the live round.
    pub(crate) fn next_event_id(&mut self) -> EventId {
        let id = EventId::new(self.round, self.event_seq);
        self.event_seq = self.event_seq.wrapping_add(1);
        id
    }

    fn event(&mut self, kind: EventKind, payload: serde_json::Value) -> GameEvent {
        GameEvent::new(self.next_event_id(), kind, payload)
    }

    fn emit(&mut self, transition: &mut Transition, kind: EventKind, payload: serde_json::Value) {
        let event = self.event(kind, payload);
        transition.events.push(event);
    }
}
