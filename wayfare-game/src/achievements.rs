//! Stopover milestones and their short-lived celebration notices.
use std::time::{Duration, Instant};

/// A celebratory notice that clears itself after `ttl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub milestone: u32,
    pub label: String,
    pub raised_at: Instant,
    pub ttl: Duration,
}

impl Notification {
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) >= self.ttl
    }
}

/// Milestone matched by exact stopover count, if any.
///
/// Progress is always one stopover per accepted leg, so exact equality never
/// skips a milestone.
#[must_use]
pub fn reached(stopovers: usize, milestones: &[u32]) -> Option<u32> {
    milestones
        .iter()
        .copied()
        .find(|&milestone| usize::try_from(milestone).is_ok_and(|m| m == stopovers))
}

#[must_use]
pub fn milestone_label(milestone: u32) -> String {
    match milestone {
        5 => "Five stopovers! Frequent flyer unlocked".to_string(),
        10 => "Ten stopovers! Certified globetrotter".to_string(),
        n => format!("{n} stopovers reached"),
    }
}

/// Build the notification for a milestone raised at `now`.
#[must_use]
pub fn notify(milestone: u32, now: Instant, ttl: Duration) -> Notification {
    Notification {
        milestone,
        label: milestone_label(milestone),
        raised_at: now,
        ttl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_only_on_exact_counts() {
        let milestones = [5, 10];
        let fired: Vec<usize> = (0..=12)
            .filter(|&stopovers| reached(stopovers, &milestones).is_some())
            .collect();
        assert_eq!(fired, vec![5, 10]);
    }

    #[test]
    fn notification_expires_after_ttl() {
        let now = Instant::now();
        let notice = notify(5, now, Duration::from_secs(5));
        assert!(notice.label.contains("Five"));
        assert!(!notice.is_expired(now + Duration::from_secs(4)));
        assert!(notice.is_expired(now + Duration::from_secs(5)));
    }

    #[test]
    fn unknown_milestones_get_generic_label() {
        assert_eq!(milestone_label(20), "20 stopovers reached");
    }
}
