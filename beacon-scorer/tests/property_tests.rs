//! Property-based tests for the scorers and the learner.
//!
//! # Invariants tested
//!
//! - **Symmetry:** proximity scores agree whichever endpoint is the viewer.
//! - **Monotonicity:** proximity scores never rise as distance grows.
//! - **Bounds:** completeness, compatibility, and model bonuses stay in range.
//! - **Idempotence:** learning twice from one history at one instant yields
//!   identical models.

use std::collections::{BTreeMap, BTreeSet};

use beacon_core::{CandidateProfile, InteractionEvent, InteractionKind, LearnedPreferenceModel};
use beacon_scorer::{
    build_model, compatibility_score, completeness_score, distance_score, haversine_km,
    interest_score, ml_score,
};
use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

const TAGS: [&str; 8] = [
    "music", "art", "chess", "hiking", "smoker", "verified", "dogs", "film",
];

fn tag_set() -> impl Strategy<Value = BTreeSet<String>> {
    proptest::sample::subsequence(TAGS.to_vec(), 0..=TAGS.len())
        .prop_map(|tags| tags.into_iter().map(str::to_owned).collect())
}

fn latitude() -> impl Strategy<Value = f64> {
    -90.0_f64..=90.0
}

fn longitude() -> impl Strategy<Value = f64> {
    -180.0_f64..=180.0
}

fn kind() -> impl Strategy<Value = InteractionKind> {
    prop_oneof![
        Just(InteractionKind::View),
        Just(InteractionKind::Like),
        Just(InteractionKind::Message),
        Just(InteractionKind::Meet),
        Just(InteractionKind::Save),
        Just(InteractionKind::Skip),
        Just(InteractionKind::Block),
        Just(InteractionKind::Other("wave".to_owned())),
    ]
}

fn now() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000)
}

fn targets() -> BTreeMap<String, CandidateProfile> {
    let shapes = [
        ("t0", "creator", "explorer", 20),
        ("t1", "organizer", "host", 24),
        ("t2", "creator", "maker", 28),
        ("t3", "organizer", "explorer", 32),
        ("t4", "creator", "host", 36),
        ("t5", "organizer", "maker", 40),
    ];
    shapes
        .into_iter()
        .zip(TAGS.windows(3))
        .map(|((id, kind, archetype, age), tags)| {
            let profile = CandidateProfile {
                profile_type: Some(kind.to_owned()),
                archetypes: [archetype.to_owned()].into(),
                age: Some(age),
                ..CandidateProfile::new(id).with_tags(tags.iter().copied())
            };
            (profile.id.clone(), profile)
        })
        .collect()
}

fn history() -> impl Strategy<Value = Vec<InteractionEvent>> {
    proptest::collection::vec(
        (0..7_usize, kind(), 0..2_000_i64, proptest::option::of(0.0_f64..200.0)),
        0..40,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .zip(1_u64..)
            .map(|((target, kind, minutes_ago, distance_km), id)| InteractionEvent {
                id,
                user_id: "ada".to_owned(),
                target_id: format!("t{target}"),
                kind,
                created_at: now() - Duration::minutes(minutes_ago * 30),
                distance_km,
                location: None,
                duration_seconds: None,
                metadata: serde_json::Value::Null,
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: swapping viewer and candidate never changes the proximity score.
    #[test]
    fn proximity_is_symmetric(
        lat_a in latitude(),
        lng_a in longitude(),
        lat_b in latitude(),
        lng_b in longitude(),
    ) {
        let forward = distance_score(haversine_km(lat_a, lng_a, lat_b, lng_b));
        let backward = distance_score(haversine_km(lat_b, lng_b, lat_a, lng_a));
        prop_assert_eq!(forward, backward);
    }

    /// Property: a larger distance never earns a higher proximity score.
    #[test]
    fn proximity_is_non_increasing(a in 0.0_f64..500.0, b in 0.0_f64..500.0) {
        let (near, far) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(distance_score(Some(near)) >= distance_score(Some(far)));
    }

    /// Property: interest overlap stays within `0..=25` and a subset scores 25.
    #[test]
    fn interest_is_bounded(viewer in tag_set(), candidate in tag_set()) {
        let score = interest_score(&viewer, &candidate);
        prop_assert!(score <= 25);
        if !viewer.is_empty() && viewer.is_subset(&candidate) {
            prop_assert_eq!(score, 25);
        }
        if viewer.is_empty() || candidate.is_empty() {
            prop_assert_eq!(score, 12);
        }
    }

    /// Property: completeness never exceeds 10 however much is filled in.
    #[test]
    fn completeness_is_capped(
        tags in tag_set(),
        looking_for in tag_set(),
        photos in 0..12_usize,
        bio_len in 0..200_usize,
        verified in any::<bool>(),
        city in proptest::option::of("[a-zA-Z ]{0,12}"),
    ) {
        let profile = CandidateProfile {
            tags,
            looking_for,
            photos: vec![String::from("p"); photos],
            bio: "x".repeat(bio_len),
            verified,
            city,
            ..CandidateProfile::new("c")
        };
        prop_assert!(completeness_score(&profile) <= 10);
    }

    /// Property: compatibility is clamped into `0..=20`.
    #[test]
    fn compatibility_is_clamped(
        essentials in tag_set(),
        dealbreakers in tag_set(),
        tags in tag_set(),
        looking_for in tag_set(),
    ) {
        let viewer = CandidateProfile { essentials, dealbreakers, ..CandidateProfile::new("v") };
        let candidate = CandidateProfile { tags, looking_for, ..CandidateProfile::new("c") };
        prop_assert!(compatibility_score(&viewer, &candidate) <= 20);
    }

    /// Property: learning is a pure function of history and clock.
    #[test]
    fn learning_is_idempotent(events in history()) {
        let targets = targets();
        let first = build_model("ada", &events, &targets, now(), 0.98);
        let second = build_model("ada", &events, &targets, now(), 0.98);
        prop_assert_eq!(&first, &second);
        for weights in [&first.profile_types, &first.interests, &first.archetypes] {
            prop_assert!(weights.values().all(|w| (-1.0..=1.0).contains(w)));
        }
        prop_assert!(first.preferred_interests.len() <= 20);
        prop_assert!(first.preferred_archetypes.len() <= 10);
    }

    /// Property: the model bonus is deterministic and bounded.
    #[test]
    fn model_bonus_is_deterministic(events in history(), index in 0..6_u32) {
        let targets = targets();
        let model: LearnedPreferenceModel = build_model("ada", &events, &targets, now(), 0.98);
        let candidate = targets.get(&format!("t{index}")).cloned().unwrap_or_default();
        let bonus = ml_score(&candidate, &model);
        prop_assert!((0.0..=20.0).contains(&bonus));
        prop_assert_eq!(bonus.to_bits(), ml_score(&candidate, &model).to_bits());
    }
}
