use chrono::NaiveDate;
use wayfare_game::{
    CandidateSet, DiscoveryError, DiscoveryRequest, EndReason, EventKind, GameConfig, GamePhase,
    GameSession, InMemoryCatalog, MapCommand, MemoryMap, Place, Price, Quote, RoundOutcome,
    Transition, render, result_summary,
};

const LONDON: &str = "27544008";
const PARIS: &str = "27539733";
const DUBAI: &str = "27540839";
const TOKYO: &str = "27542089";
const NEW_YORK: &str = "27537542";
const HEATHROW: &str = "95565050";
const SAN_FRANCISCO: &str = "27537611";
const DELHI: &str = "27540688";

fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::from_json(include_str!("../../wayfare-tester/data/world.json")).unwrap()
}

fn place(id: &str) -> Place {
    catalog().require(id).unwrap().clone()
}

fn anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

fn new_session() -> GameSession {
    let config = GameConfig {
        start_date: Some(anchor()),
        ..GameConfig::default()
    };
    GameSession::new(config, place(LONDON))
}

/// Feeds `legs` to the live round and returns the transition.
fn offer(
    session: &mut GameSession,
    request: &DiscoveryRequest,
    legs: &[(&str, f64)],
) -> RoundOutcome {
    let from = session.current_location().clone();
    let quotes = legs
        .iter()
        .map(|(to, price)| Quote::new(from.clone(), place(to), request.anchor, Price::new(*price)));
    session.resolve_discovery(request.token, Ok(CandidateSet::dedup(quotes)))
}

fn fly(session: &mut GameSession, to: &str) -> Transition {
    let marker = session
        .candidates()
        .iter()
        .find(|candidate| candidate.quote.destination().entity_id == to)
        .map(|candidate| candidate.marker)
        .expect("destination on offer");
    session.select(marker).unwrap()
}

fn ready(outcome: RoundOutcome) -> Transition {
    match outcome {
        RoundOutcome::Ready(transition) => transition,
        other => panic!("expected candidates, got {other:?}"),
    }
}

#[test]
fn london_paris_dubai_runs_over_budget() {
    let mut session = new_session();
    let request = session.start("Ada").unwrap().request.unwrap();
    ready(offer(&mut session, &request, &[(PARIS, 80.0), (TOKYO, 900.0)]));

    let request = fly(&mut session, PARIS).request.unwrap();
    assert_eq!(session.spend(), &[80.0]);
    assert!((session.remaining() - 920.0).abs() < 1e-9);
    assert_eq!(request.origin.as_ref().unwrap().entity_id, PARIS);

    ready(offer(&mut session, &request, &[(DUBAI, 950.0)]));
    let transition = fly(&mut session, DUBAI);
    assert_eq!(session.spend(), &[80.0, 950.0]);
    assert_eq!(session.phase(), GamePhase::End(EndReason::OverBudget));
    assert!(transition.has_event(EventKind::GameEnded));

    let summary = result_summary(&session).unwrap();
    assert_eq!(summary.stops, vec!["London", "Paris", "Dubai"]);
    assert!((summary.spent - 1030.0).abs() < 1e-9);
    assert!(summary.headline.contains("$30.00"));
}

#[test]
fn westbound_hop_after_paris_is_not_offered() {
    let mut session = new_session();
    let request = session.start("Ada").unwrap().request.unwrap();
    ready(offer(&mut session, &request, &[(PARIS, 80.0)]));
    let request = fly(&mut session, PARIS).request.unwrap();

    let transition = ready(offer(
        &mut session,
        &request,
        &[(NEW_YORK, 950.0), (DUBAI, 300.0)],
    ));
    let offered: Vec<_> = session
        .candidates()
        .iter()
        .map(|candidate| candidate.quote.destination().entity_id.as_str())
        .collect();
    assert_eq!(offered, vec![DUBAI]);
    let added = transition
        .commands
        .iter()
        .filter(|command| matches!(command, MapCommand::AddMarker { candidate: true, .. }))
        .count();
    assert_eq!(added, 1);
}

#[test]
fn budget_boundary_is_inclusive() {
    let mut session = new_session();
    let request = session.start("Ada").unwrap().request.unwrap();
    ready(offer(&mut session, &request, &[(TOKYO, 1000.0)]));
    fly(&mut session, TOKYO);
    assert_eq!(session.phase(), GamePhase::Playing);
    assert!(session.remaining().abs() < 1e-9);

    let mut session = new_session();
    let request = session.start("Ada").unwrap().request.unwrap();
    ready(offer(&mut session, &request, &[(TOKYO, 1000.01)]));
    fly(&mut session, TOKYO);
    assert_eq!(session.phase(), GamePhase::End(EndReason::OverBudget));
}

#[test]
fn circling_back_through_heathrow_wins() {
    let mut session = new_session();
    let mut request = session.start("Ada").unwrap().request.unwrap();
    let route = [
        (DELHI, 250.0),
        (TOKYO, 300.0),
        (SAN_FRANCISCO, 200.0),
        (NEW_YORK, 100.0),
    ];
    for (to, price) in route {
        ready(offer(&mut session, &request, &[(to, price)]));
        request = fly(&mut session, to).request.unwrap();
    }
    ready(offer(&mut session, &request, &[(HEATHROW, 140.0)]));
    let transition = fly(&mut session, HEATHROW);

    assert_eq!(session.phase(), GamePhase::End(EndReason::Won));
    assert!(transition.request.is_none());
    let submission = transition.submission.unwrap();
    assert_eq!(
        submission.stops,
        [LONDON, DELHI, TOKYO, SAN_FRANCISCO, NEW_YORK, HEATHROW].join(",")
    );
    let summary = result_summary(&session).unwrap();
    assert!((summary.remaining - 10.0).abs() < 1e-9);
    assert!(summary.distance_km > 25_000.0);
}

#[test]
fn dead_end_leaves_no_candidates_on_the_map() {
    let mut map = MemoryMap::new();
    let mut session = new_session();
    let start = session.start("Ada").unwrap();
    render(&mut map, &start.commands);
    let request = start.request.unwrap();
    render(
        &mut map,
        &ready(offer(&mut session, &request, &[(PARIS, 80.0)])).commands,
    );
    let next = fly(&mut session, PARIS);
    render(&mut map, &next.commands);
    assert_eq!(map.candidate_markers().count(), 0);

    let outcome = session.resolve_discovery(
        next.request.unwrap().token,
        Err(DiscoveryError::Rejected("quota exceeded".to_string())),
    );
    let RoundOutcome::DeadEnd(transition) = outcome else {
        panic!("expected a dead end");
    };
    render(&mut map, &transition.commands);
    assert_eq!(session.phase(), GamePhase::End(EndReason::NoFlights));
    assert!(session.viewing_markers().is_empty());
    assert_eq!(map.candidate_markers().count(), 0);
    assert_eq!(map.lines.len(), 1);
    assert_eq!(map.markers.len(), 2);
}

#[test]
fn restart_clears_the_drawn_route() {
    let mut map = MemoryMap::new();
    let mut session = new_session();
    let start = session.start("Ada").unwrap();
    render(&mut map, &start.commands);
    let request = start.request.unwrap();
    render(
        &mut map,
        &ready(offer(&mut session, &request, &[(PARIS, 80.0)])).commands,
    );
    render(&mut map, &fly(&mut session, PARIS).commands);

    let restart = session.restart().unwrap();
    render(&mut map, &restart.commands);
    assert!(map.lines.is_empty());
    assert_eq!(map.markers.len(), 1);
    assert_eq!(session.itinerary().len(), 1);
    assert!(session.spend().is_empty());
    assert_eq!(
        restart.request.unwrap().origin.unwrap().entity_id,
        LONDON
    );
}

#[test]
fn response_after_restart_is_discarded() {
    let mut session = new_session();
    let stale = session.start("Ada").unwrap().request.unwrap();
    let fresh = session.restart().unwrap().request.unwrap();
    assert_eq!(
        offer(&mut session, &stale, &[(PARIS, 80.0)]),
        RoundOutcome::Stale
    );
    assert!(session.candidates().is_empty());
    ready(offer(&mut session, &fresh, &[(PARIS, 80.0)]));
    assert_eq!(session.candidates().len(), 1);
}

#[test]
fn milestones_fire_at_five_and_ten() {
    let mut config = GameConfig {
        start_date: Some(anchor()),
        budget_limit: 100_000.0,
        ..GameConfig::default()
    };
    config.milestones = vec![5, 10];
    let mut session = GameSession::new(config, place(LONDON));
    let mut request = session.start("Ada").unwrap().request.unwrap();
    let mut fired = Vec::new();
    for hop in 1..=11_u32 {
        let from = session.current_location().clone();
        let mut next = from.clone();
        next.entity_id = format!("hop-{hop}");
        next.name = format!("Hop {hop}");
        next.coordinates.lng += 15.0;
        let quote = Quote::new(from, next, request.anchor, Price::new(5.0));
        ready(session.resolve_discovery(request.token, Ok(CandidateSet::dedup([quote]))));
        let marker = session.viewing_markers()[0];
        let transition = session.select(marker).unwrap();
        if transition.has_event(EventKind::MilestoneReached) {
            fired.push(session.stopovers());
        }
        request = transition.request.unwrap();
    }
    assert_eq!(fired, vec![5, 10]);
}

#[test]
fn later_departures_move_the_anchor() {
    let mut session = new_session();
    let request = session.start("Ada").unwrap().request.unwrap();
    let from = session.current_location().clone();
    let depart = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
    let quote = Quote::new(from, place(PARIS), depart, Price::new(80.0));
    ready(session.resolve_discovery(request.token, Ok(CandidateSet::dedup([quote]))));
    let next = fly(&mut session, PARIS).request.unwrap();
    assert_eq!(next.anchor, depart);
    assert_eq!(session.anchor(), depart);
}
