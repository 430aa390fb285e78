//! Structured events emitted by session transitions.
//!
//! Events are what a UI shows in its log or toasts; they never drive the state
//! machine. Each carries a stable id of (round, sequence).

use serde::{Deserialize, Serialize};

use crate::session::RoundToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    /// Discovery round current when the event was emitted.
    pub round: u64,
    /// Session-wide sequence number (0-based).
    pub seq: u32,
}

impl EventId {
    #[must_use]
    pub const fn new(round: RoundToken, seq: u32) -> Self {
        Self {
            round: round.value(),
            seq,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStarted,
    SessionRestarted,
    DiscoveryIssued,
    DiscoveryStalled,
    CandidatesReady,
    LegAccepted,
    MilestoneReached,
    GameEnded,
    LeaderboardSubmitted,
    LeaderboardSubmitFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

/// Hint for how the UI should surface an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiSurfaceHint {
    Log,
    Toast,
    Modal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub severity: EventSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_surface_hint: Option<UiSurfaceHint>,
    /// Structured details for logs and downstream rendering.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl GameEvent {
    #[must_use]
    pub fn new(id: EventId, kind: EventKind, payload: serde_json::Value) -> Self {
        let (severity, ui_surface_hint) = kind.presentation();
        Self {
            id,
            kind,
            severity,
            ui_surface_hint: Some(ui_surface_hint),
            payload,
        }
    }
}

impl EventKind {
    /// Default severity and surface for this kind.
    #[must_use]
    pub const fn presentation(self) -> (EventSeverity, UiSurfaceHint) {
        match self {
            Self::MilestoneReached => (EventSeverity::Info, UiSurfaceHint::Toast),
            Self::GameEnded => (EventSeverity::Critical, UiSurfaceHint::Modal),
            Self::DiscoveryStalled | Self::LeaderboardSubmitFailed => {
                (EventSeverity::Warning, UiSurfaceHint::Toast)
            }
            Self::SessionStarted
            | Self::SessionRestarted
            | Self::DiscoveryIssued
            | Self::CandidatesReady
            | Self::LegAccepted
            | Self::LeaderboardSubmitted => (EventSeverity::Info, UiSurfaceHint::Log),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_roundtrips_and_has_stable_id() {
        let id = EventId::new(RoundToken::default().next(), 3);
        let event = GameEvent::new(
            id,
            EventKind::MilestoneReached,
            serde_json::json!({ "milestone": 5 }),
        );
        assert_eq!(event.id.round, 1);
        assert_eq!(event.severity, EventSeverity::Info);
        assert_eq!(event.ui_surface_hint, Some(UiSurfaceHint::Toast));

        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("milestone_reached"));
        let restored: GameEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, event);
    }

    #[test]
    fn endings_surface_as_modal() {
        assert_eq!(
            EventKind::GameEnded.presentation(),
            (EventSeverity::Critical, UiSurfaceHint::Modal)
        );
    }
}
