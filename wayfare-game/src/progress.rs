//! Forward-progress filter: you are circumnavigating, not oscillating.
use crate::constants::FORWARD_HEMISPHERE_DEGREES;
use crate::discovery::CandidateSet;
use crate::geo::bearing;
use crate::place::Place;

/// Keep candidates in the forward hemisphere as seen from `previous_stop`.
///
/// A candidate survives when the bearing from the last-departed city to its
/// destination is strictly below 180°.
#[must_use]
pub fn filter(candidates: CandidateSet, previous_stop: &Place) -> CandidateSet {
    let before = candidates.len();
    let kept = candidates.retain(|quote| is_forward(previous_stop, quote.destination()));
    if kept.len() < before {
        log::debug!(
            "forward progress from {} dropped {} of {before} candidates",
            previous_stop.name,
            before - kept.len()
        );
    }
    kept
}

#[must_use]
pub fn is_forward(previous_stop: &Place, destination: &Place) -> bool {
    bearing(previous_stop.coordinates, destination.coordinates) < FORWARD_HEMISPHERE_DEGREES
}

/// The city the filter measures from: the stop before the current location.
///
/// `None` while the player is still at the origin, so the first leg is free.
#[must_use]
pub fn previous_stop(itinerary: &[Place]) -> Option<&Place> {
    itinerary.len().checked_sub(2).and_then(|idx| itinerary.get(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::bearing;
    use crate::place::fixtures::{dubai, london, new_york, paris, tokyo};
    use crate::quote::{Price, Quote};
    use chrono::NaiveDate;

    fn candidates(destinations: Vec<Place>) -> CandidateSet {
        let depart = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        CandidateSet::dedup(
            destinations
                .into_iter()
                .map(|to| Quote::new(paris(), to, depart, Price::new(100.0))),
        )
    }

    #[test]
    fn westward_destinations_are_backtracking() {
        let kept = filter(candidates(vec![tokyo(), new_york(), dubai()]), &london());
        let names: Vec<_> = kept
            .quotes()
            .iter()
            .map(|q| q.destination().name.as_str())
            .collect();
        assert_eq!(names, vec!["Tokyo", "Dubai"]);
    }

    #[test]
    fn survivors_are_strictly_forward() {
        let previous = london();
        let kept = filter(
            candidates(vec![tokyo(), new_york(), dubai(), paris()]),
            &previous,
        );
        for quote in kept.quotes() {
            assert!(bearing(previous.coordinates, quote.destination().coordinates) < 180.0);
        }
    }

    #[test]
    fn everything_behind_empties_the_set() {
        let kept = filter(candidates(vec![new_york()]), &london());
        assert!(kept.is_empty());
    }

    #[test]
    fn previous_stop_needs_one_leg() {
        assert!(previous_stop(&[]).is_none());
        assert!(previous_stop(&[london()]).is_none());
        let itinerary = [london(), paris(), dubai()];
        assert_eq!(previous_stop(&itinerary).map(|p| p.name.as_str()), Some("Paris"));
    }
}
