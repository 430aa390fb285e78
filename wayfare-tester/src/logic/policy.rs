use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use wayfare_game::geo::bearing;
use wayfare_game::{Candidate, GameSession, MarkerHandle};

/// Distance an eastbound run covers before it turns for home.
pub const HOMEWARD_AFTER_KM: f64 = 20_000.0;

/// Decision returned by a [`TravelPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub marker: MarkerHandle,
    pub rationale: String,
}

impl PolicyDecision {
    fn new(candidate: &Candidate, rationale: impl Into<String>) -> Self {
        Self {
            marker: candidate.marker,
            rationale: rationale.into(),
        }
    }
}

/// Policy interface for automated play strategies.
pub trait TravelPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick one of the session's current candidates, if any.
    fn pick(&mut self, session: &GameSession) -> Option<PolicyDecision>;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TravelStrategy {
    /// Always the lowest fare.
    Cheapest,
    /// Keep heading east; fly home once far enough round.
    Eastbound,
    Random,
}

impl TravelStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            TravelStrategy::Cheapest => "Cheapest",
            TravelStrategy::Eastbound => "Eastbound",
            TravelStrategy::Random => "Random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn TravelPolicy + Send> {
        match self {
            TravelStrategy::Cheapest => Box::new(CheapestPolicy),
            TravelStrategy::Eastbound => Box::new(EastboundPolicy),
            TravelStrategy::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for TravelStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct CheapestPolicy;
struct EastboundPolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

fn cheapest<'a>(candidates: impl Iterator<Item = &'a Candidate>) -> Option<&'a Candidate> {
    candidates.min_by(|a, b| a.quote.price.amount().total_cmp(&b.quote.price.amount()))
}

impl TravelPolicy for CheapestPolicy {
    fn name(&self) -> &'static str {
        "Cheapest"
    }

    fn pick(&mut self, session: &GameSession) -> Option<PolicyDecision> {
        cheapest(session.candidates().iter()).map(|candidate| {
            PolicyDecision::new(candidate, format!("fare {}", candidate.quote.price.display))
        })
    }
}

impl TravelPolicy for EastboundPolicy {
    fn name(&self) -> &'static str {
        "Eastbound"
    }

    fn pick(&mut self, session: &GameSession) -> Option<PolicyDecision> {
        let remaining = session.remaining();
        let candidates = session.candidates();
        let affordable = |candidate: &&Candidate| candidate.quote.price.amount() <= remaining;

        if session.distance_km() >= HOMEWARD_AFTER_KM
            && let Some(home) = candidates
                .iter()
                .filter(affordable)
                .find(|candidate| candidate.quote.destination().same_city(session.origin()))
        {
            return Some(PolicyDecision::new(home, "homeward"));
        }

        // Heading closest to due east from here.
        let here = session.current_location().coordinates;
        let drift = |candidate: &Candidate| {
            (bearing(here, candidate.quote.destination().coordinates) - 90.0).abs()
        };
        let away = |candidate: &&Candidate| !candidate.quote.destination().same_city(session.origin());
        candidates
            .iter()
            .filter(away)
            .filter(affordable)
            .min_by(|&a, &b| drift(a).total_cmp(&drift(b)))
            .map(|candidate| {
                PolicyDecision::new(candidate, format!("{:.0}° off east", drift(candidate)))
            })
            .or_else(|| {
                cheapest(candidates.iter().filter(away))
                    .or_else(|| cheapest(candidates.iter()))
                    .map(|candidate| PolicyDecision::new(candidate, "nothing affordable"))
            })
    }
}

impl TravelPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick(&mut self, session: &GameSession) -> Option<PolicyDecision> {
        let candidates = session.candidates();
        if candidates.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..candidates.len());
        candidates
            .get(idx)
            .map(|candidate| PolicyDecision::new(candidate, format!("roll {idx}")))
    }
}
