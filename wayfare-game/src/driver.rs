//! Async driver wiring a [`GameSession`] to its external collaborators.
//!
//! The driver runs discovery rounds, renders every transition onto the map,
//! and publishes events on a channel the UI can read while a round is still
//! pending. One discovery is in flight at a time; a round that outlives the
//! stall threshold is flagged but still awaited. Dropping a pending
//! `start`/`select` future abandons that round, and `restart` or `resume`
//! issues a fresh one.
//!
//! Wins go to the leaderboard on a spawned task, so a slow or broken
//! leaderboard never holds back the end of the game.
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::discovery::{CandidateSet, DestinationDiscovery, DiscoveryError, FlightSearch};
use crate::events::{EventKind, GameEvent};
use crate::leaderboard::{Leaderboard, LeaderboardEntry, LeaderboardError, LeaderboardMetric, WinSubmission};
use crate::map::{self, MapProvider, MarkerHandle};
use crate::place::PlaceCatalog;
use crate::session::{
    DiscoveryRequest, GamePhase, GameSession, RoundOutcome, SessionError, Transition,
};

pub struct GameDriver<F, L, M> {
    session: GameSession,
    discovery: DestinationDiscovery<F>,
    leaderboard: L,
    map: M,
    events_tx: UnboundedSender<GameEvent>,
    events_rx: Option<UnboundedReceiver<GameEvent>>,
    submissions: Vec<JoinHandle<()>>,
}

impl<F, L, M> GameDriver<F, L, M>
where
    F: FlightSearch,
    L: Leaderboard + Clone + 'static,
    M: MapProvider,
{
    /// Bind `session` to its collaborators. The search window and region
    /// restriction come from the session's configuration.
    #[must_use]
    pub fn new(session: GameSession, provider: F, leaderboard: L, map: M) -> Self {
        let config = session.config();
        let discovery = DestinationDiscovery::new(provider, config.window_months)
            .with_region(config.region.clone(), None);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session,
            discovery,
            leaderboard,
            map,
            events_tx,
            events_rx: Some(events_rx),
            submissions: Vec::new(),
        }
    }

    /// Resolve region restrictions through the full catalog ancestry.
    #[must_use]
    pub fn with_catalog(self, catalog: Arc<dyn PlaceCatalog + Send + Sync>) -> Self {
        Self {
            discovery: self.discovery.with_catalog(catalog),
            ..self
        }
    }

    /// Start the game and run the first discovery round.
    ///
    /// # Errors
    ///
    /// Propagates the session's rejection (blank name, already started).
    pub async fn start(&mut self, player_name: &str) -> Result<GamePhase, SessionError> {
        let transition = self.session.start(player_name)?;
        self.settle(transition).await;
        Ok(self.session.phase())
    }

    /// Accept the clicked candidate and run whatever follows.
    ///
    /// # Errors
    ///
    /// Propagates the session's rejection (not playing, unknown marker).
    pub async fn select(&mut self, marker: MarkerHandle) -> Result<GamePhase, SessionError> {
        let transition = self.session.select(marker)?;
        self.settle(transition).await;
        Ok(self.session.phase())
    }

    /// # Errors
    ///
    /// Fails if the game never started.
    pub async fn restart(&mut self) -> Result<GamePhase, SessionError> {
        let transition = self.session.restart()?;
        self.settle(transition).await;
        Ok(self.session.phase())
    }

    /// Redraw a restored session and continue play.
    ///
    /// # Errors
    ///
    /// Fails outside `Playing`.
    pub async fn resume(&mut self) -> Result<GamePhase, SessionError> {
        let transition = self.session.resume()?;
        self.settle(transition).await;
        Ok(self.session.phase())
    }

    /// Ranked leaderboard rows for `metric`.
    ///
    /// # Errors
    ///
    /// Returns the leaderboard's error unchanged.
    pub async fn top(
        &self,
        metric: LeaderboardMetric,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        self.leaderboard.fetch_top(metric).await
    }

    /// Wait for leaderboard submissions still in flight.
    pub async fn flush_submissions(&mut self) {
        for handle in self.submissions.drain(..) {
            if let Err(err) = handle.await {
                log::warn!("leaderboard submission task failed: {err}");
            }
        }
    }

    /// Clear an expired milestone notice. Returns true if one was cleared.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.session.expire_notification(now)
    }

    #[must_use]
    pub const fn session(&self) -> &GameSession {
        &self.session
    }

    #[must_use]
    pub const fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    #[must_use]
    pub const fn leaderboard(&self) -> &L {
        &self.leaderboard
    }

    /// Take the event stream. Only the first call gets it; afterwards
    /// [`GameDriver::drain_events`] has nothing left to return.
    pub fn subscribe(&mut self) -> Option<UnboundedReceiver<GameEvent>> {
        self.events_rx.take()
    }

    /// Events published since the last drain, for callers that never
    /// subscribed.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        let Some(events) = self.events_rx.as_mut() else {
            return Vec::new();
        };
        let mut drained = Vec::new();
        while let Ok(event) = events.try_recv() {
            drained.push(event);
        }
        drained
    }

    pub fn into_session(self) -> GameSession {
        self.session
    }

    async fn settle(&mut self, transition: Transition) {
        let mut next = Some(transition);
        while let Some(Transition {
            commands,
            events,
            request,
            submission,
        }) = next.take()
        {
            map::render(&mut self.map, &commands);
            for event in events {
                publish(&self.events_tx, event);
            }
            if let Some(submission) = submission {
                self.submit(submission);
            }
            let Some(request) = request else {
                break;
            };
            let result = self.await_candidates(&request).await;
            next = match self.session.resolve_discovery(request.token, result) {
                RoundOutcome::Stale => None,
                RoundOutcome::Ready(transition) | RoundOutcome::DeadEnd(transition) => {
                    Some(transition)
                }
            };
        }
    }

    async fn await_candidates(
        &mut self,
        request: &DiscoveryRequest,
    ) -> Result<CandidateSet, DiscoveryError> {
        let stall_after = self.session.config().stall_after();
        let search = self
            .discovery
            .discover(request.origin.as_ref(), request.anchor);
        tokio::pin!(search);
        tokio::select! {
            result = &mut search => return result,
            () = tokio::time::sleep(stall_after) => {}
        }
        if let Some(event) = self.session.mark_stalled(request.token) {
            publish(&self.events_tx, event);
        }
        search.await
    }

    fn submit(&mut self, submission: WinSubmission) {
        self.submissions.retain(|handle| !handle.is_finished());
        let id = self.session.next_event_id();
        let board = self.leaderboard.clone();
        let events = self.events_tx.clone();
        self.submissions.push(tokio::spawn(async move {
            let payload = serde_json::json!({
                "name": submission.name,
                "stops": submission.stops,
            });
            let kind = match board.submit_win(&submission).await {
                Ok(()) => {
                    log::info!("recorded win for {}", submission.name);
                    EventKind::LeaderboardSubmitted
                }
                Err(err) => {
                    log::warn!("could not record win for {}: {err}", submission.name);
                    EventKind::LeaderboardSubmitFailed
                }
            };
            publish(&events, GameEvent::new(id, kind, payload));
        }));
    }
}

fn publish(events: &UnboundedSender<GameEvent>, event: GameEvent) {
    if events.send(event).is_err() {
        log::debug!("event receiver dropped; discarding event");
    }
}
