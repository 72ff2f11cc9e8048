//! Selector tests: the PREUNI scenario with literal scores, plus properties

use burstbook::models::Resource;
use burstbook::selector::{ResourceSelector, EXHAUSTED_QUOTA_PENALTY, NAME_MISMATCH_PENALTY};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 1, 2, 0, 0).unwrap()
}

fn selector() -> ResourceSelector {
    ResourceSelector::new(vec!["PREUNI".to_string()], Duration::seconds(60))
}

fn scenario() -> Vec<Resource> {
    vec![
        Resource::new("1", "Other")
            .with_quota(100, 10)
            .with_reservation_start(now() + Duration::seconds(10)),
        Resource::new("2", "PREUNI Gala")
            .with_quota(100, 0)
            .with_reservation_start(now() + Duration::seconds(5)),
        Resource::new("3", "PREUNI Gala")
            .with_quota(100, 10)
            .with_reservation_start(now() + Duration::seconds(20)),
    ]
}

#[test]
fn test_scenario_literal_scores() {
    let selector = selector();
    let resources = scenario();

    let scores: Vec<i64> = resources.iter().map(|r| selector.score(r, now())).collect();
    assert_eq!(
        scores,
        vec![
            NAME_MISMATCH_PENALTY + 70_000,
            EXHAUSTED_QUOTA_PENALTY + 65_000,
            80_000,
        ]
    );
    assert_eq!(scores, vec![1_000_000_000_070_000, 10_000_000_065_000, 80_000]);

    assert_eq!(selector.pick(&resources, now()).unwrap().id, "3");
}

#[test]
fn test_scenario_rank_order() {
    let resources = scenario();
    let ids: Vec<_> = selector()
        .rank(&resources, now())
        .into_iter()
        .map(|(_, r)| r.id.as_str())
        .collect();
    assert_eq!(ids, ["3", "2", "1"]);
}

#[test]
fn test_pick_is_idempotent() {
    let resources = scenario();
    let selector = selector();
    let first = selector.pick(&resources, now()).unwrap();
    let second = selector.pick(&resources, now()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_case_insensitive_keywords() {
    let resource = Resource::new("1", "preuni final night").with_quota(1, 1);
    assert!(selector().is_target(&resource));
}

fn arb_resource(name: &'static str) -> impl Strategy<Value = Resource> {
    (
        any::<bool>(),
        -100_000_i64..100_000,
        0_i64..50,
        prop_oneof![Just(0_u8), Just(1), Just(2)],
    )
        .prop_map(move |(booked, offset_secs, remaining, schedule)| {
            let at = now() + Duration::seconds(offset_secs);
            let mut resource = Resource::new("x", name).with_quota(50, remaining);
            resource = match schedule {
                0 => resource.with_reservation_start(at),
                1 => resource.with_event_at(at),
                _ => resource,
            };
            if booked {
                resource = resource.with_booking("1");
            }
            resource
        })
}

proptest! {
    #[test]
    fn prop_keyword_match_dominates(
        matching in arb_resource("PREUNI Gala"),
        other in arb_resource("Homecoming"),
    ) {
        let selector = selector();
        prop_assert!(selector.score(&matching, now()) < selector.score(&other, now()));
    }

    #[test]
    fn prop_capacity_dominates_time(
        offset_a in -100_000_i64..100_000,
        offset_b in -100_000_i64..100_000,
    ) {
        let with_seats = Resource::new("a", "PREUNI")
            .with_quota(10, 1)
            .with_reservation_start(now() + Duration::seconds(offset_a));
        let full = Resource::new("b", "PREUNI")
            .with_quota(10, 0)
            .with_reservation_start(now() + Duration::seconds(offset_b));
        let selector = selector();
        prop_assert!(selector.score(&with_seats, now()) < selector.score(&full, now()));
    }

    #[test]
    fn prop_score_is_non_negative(resource in arb_resource("PREUNI")) {
        prop_assert!(selector().score(&resource, now()) >= 0);
    }
}
