//! Preference learning from interaction history.
//!
//! A learning run reads a user's recent interactions, weighs each by its kind
//! and age, accumulates the weights onto the attributes of the profiles
//! acted upon, normalises the result, and replaces the user's stored model.
//! Ranking never triggers learning; the two pipelines meet only through the
//! persisted model.

use std::collections::{BTreeMap, BTreeSet};
use std::thread;

use beacon_core::{
    AGE_BUCKET_YEARS, AgeRange, CandidateProfile, InteractionEvent, InteractionStore,
    LearnedPreferenceModel, PreferenceStore, ProfileStore, age_bucket,
};
use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::error::{EngineError, authenticated};
use crate::proximity::MAX_DISTANCE_KM;
use crate::types::{BatchSummary, LearnOutcome, LearnerConfig};

/// Normalised weight an age bucket or profile type must exceed to be preferred.
pub const TYPE_THRESHOLD: f64 = 0.3;
/// Normalised weight an interest or archetype must exceed to be preferred.
pub const TAG_THRESHOLD: f64 = 0.2;
/// Interests considered for the preferred list.
pub const TOP_INTERESTS: usize = 20;
/// Archetypes considered for the preferred list.
pub const TOP_ARCHETYPES: usize = 10;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Builds and persists per-user preference models.
///
/// # Examples
/// ```
/// use beacon_core::{CandidateProfile, InteractionKind, test_support::MemoryStore};
/// use beacon_scorer::{InteractionRecorder, PreferenceLearner, RecordInteraction};
///
/// let store = MemoryStore::with_profiles([
///     CandidateProfile::new("grace").with_tags(["music"]),
/// ]);
/// InteractionRecorder::new(&store).record("ada", RecordInteraction {
///     target_id: "grace".into(),
///     kind: InteractionKind::Like,
///     ..RecordInteraction::default()
/// })?;
/// let outcome = PreferenceLearner::new(&store, &store, &store).learn("ada")?;
/// let model = outcome.model().map(|m| m.preferred_interests.clone());
/// assert_eq!(model, Some(vec!["music".to_owned()]));
/// # Ok::<(), beacon_scorer::EngineError>(())
/// ```
#[derive(Debug)]
pub struct PreferenceLearner<I, P, M> {
    interactions: I,
    profiles: P,
    models: M,
    config: LearnerConfig,
}

impl<I, P, M> PreferenceLearner<I, P, M>
where
    I: InteractionStore,
    P: ProfileStore,
    M: PreferenceStore,
{
    /// Build a learner with the default configuration.
    pub fn new(interactions: I, profiles: P, models: M) -> Self {
        Self::with_config(interactions, profiles, models, LearnerConfig::default())
    }

    /// Build a learner with explicit tunables.
    pub const fn with_config(interactions: I, profiles: P, models: M, config: LearnerConfig) -> Self {
        Self {
            interactions,
            profiles,
            models,
            config,
        }
    }

    /// Learn `user_id`'s preferences as of now.
    ///
    /// # Errors
    /// See [`PreferenceLearner::learn_at`].
    pub fn learn(&self, user_id: &str) -> Result<LearnOutcome, EngineError> {
        self.learn_at(user_id, Utc::now())
    }

    /// Learn `user_id`'s preferences with an explicit clock.
    ///
    /// Returns [`LearnOutcome::NoInteractions`] without persisting anything
    /// when the user has no history, or when none of the history's targets
    /// resolve to a stored profile. A previously stored model is kept.
    ///
    /// # Errors
    /// - [`EngineError::Authentication`] when `user_id` is blank.
    /// - [`EngineError::Storage`] when a read or the final write fails; no
    ///   model is persisted in that case.
    pub fn learn_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LearnOutcome, EngineError> {
        let user = authenticated(user_id)?;
        let events = self
            .interactions
            .recent_interactions(user, self.config.history_limit)?;
        if events.is_empty() {
            info!("no interactions for {user}; model left untouched");
            return Ok(LearnOutcome::NoInteractions);
        }

        let target_ids: Vec<String> = events
            .iter()
            .map(|event| event.target_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let targets: BTreeMap<String, CandidateProfile> = self
            .profiles
            .profiles_by_ids(&target_ids)?
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect();
        let unresolved = target_ids
            .iter()
            .filter(|id| !targets.contains_key(*id))
            .count();
        if unresolved > 0 {
            warn!("skipping interactions with {unresolved} unresolved targets for {user}");
        }
        if targets.is_empty() {
            info!("no resolvable interactions for {user}; model left untouched");
            return Ok(LearnOutcome::NoInteractions);
        }

        let model = build_model(user, &events, &targets, now, self.config.decay_per_day);
        self.models.save_preferences(&model)?;
        info!(
            "learned preferences for {user} from {} of {} interactions ({} preferences)",
            model.interaction_count,
            events.len(),
            model.preference_count()
        );
        Ok(LearnOutcome::Learned(Box::new(model)))
    }

    /// Learn preferences for every user with interactions, as of now.
    ///
    /// # Errors
    /// See [`PreferenceLearner::learn_all_at`].
    pub fn learn_all(&self) -> Result<BatchSummary, EngineError> {
        self.learn_all_at(Utc::now())
    }

    /// Learn preferences for every user with interactions.
    ///
    /// Users are processed one at a time with the configured pacing delay
    /// between them. A failure for one user is logged and counted, and the
    /// batch continues.
    ///
    /// # Errors
    /// Returns [`EngineError::Storage`] only when the user list cannot be read.
    pub fn learn_all_at(&self, now: DateTime<Utc>) -> Result<BatchSummary, EngineError> {
        let users = self.interactions.interacting_users()?;
        let mut summary = BatchSummary::default();
        for (position, user) in users.iter().enumerate() {
            if position > 0 && !self.config.pacing.is_zero() {
                thread::sleep(self.config.pacing);
            }
            match self.learn_at(user, now) {
                Ok(LearnOutcome::Learned(_)) => summary.learned += 1,
                Ok(LearnOutcome::NoInteractions) => summary.skipped += 1,
                Err(err) => {
                    warn!("learning failed for {user}: {err}");
                    summary.failed += 1;
                }
            }
        }
        info!(
            "batch learning finished: {} learned, {} skipped, {} failed",
            summary.learned, summary.skipped, summary.failed
        );
        Ok(summary)
    }
}

/// Build a model from `events` without touching storage.
///
/// `targets` maps target identities to their profiles; events whose target is
/// missing are ignored. The result is a pure function of its inputs, so two
/// calls with the same `now` yield identical models.
#[must_use]
pub fn build_model(
    user_id: &str,
    events: &[InteractionEvent],
    targets: &BTreeMap<String, CandidateProfile>,
    now: DateTime<Utc>,
    decay_per_day: f64,
) -> LearnedPreferenceModel {
    let mut acc = PreferenceAccumulator::default();
    for event in events {
        if let Some(target) = targets.get(&event.target_id) {
            let weight = event.kind.weight();
            let decayed = decayed_weight(weight, event.created_at, now, decay_per_day);
            acc.add(target, event.distance_km, weight, decayed);
        }
    }
    acc.into_model(user_id, now)
}

/// Scale `weight` by `decay_per_day` raised to the event's fractional age.
///
/// Events dated after `now` count as age zero.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "decay is exponential in fractional days"
)]
pub fn decayed_weight(
    weight: f64,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    decay_per_day: f64,
) -> f64 {
    let age_ms = (now - created_at).num_milliseconds().max(0);
    let days = age_ms as f64 / MILLIS_PER_DAY;
    weight * decay_per_day.powf(days)
}

#[derive(Debug, Default)]
struct PreferenceAccumulator {
    profile_types: BTreeMap<String, f64>,
    interests: BTreeMap<String, f64>,
    archetypes: BTreeMap<String, f64>,
    ages: BTreeMap<u32, f64>,
    distance_sum: f64,
    distance_count: usize,
    contributing: usize,
}

impl PreferenceAccumulator {
    #[expect(clippy::float_arithmetic, reason = "weights are summed per key")]
    fn add(
        &mut self,
        target: &CandidateProfile,
        distance_km: Option<f64>,
        weight: f64,
        decayed: f64,
    ) {
        self.contributing += 1;
        if let Some(kind) = &target.profile_type {
            *self.profile_types.entry(kind.clone()).or_default() += decayed;
        }
        for tag in &target.tags {
            *self.interests.entry(tag.clone()).or_default() += decayed;
        }
        for archetype in &target.archetypes {
            *self.archetypes.entry(archetype.clone()).or_default() += decayed;
        }
        if let Some(age) = target.age {
            *self.ages.entry(age_bucket(age)).or_default() += decayed;
        }
        if weight > 0.0
            && let Some(km) =
                distance_km.filter(|value| (0.0..=MAX_DISTANCE_KM).contains(value))
        {
            self.distance_sum += km * decayed;
            self.distance_count += 1;
        }
    }

    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "the preferred distance averages the weighted distance sum"
    )]
    fn into_model(self, user_id: &str, now: DateTime<Utc>) -> LearnedPreferenceModel {
        let profile_types = normalise(self.profile_types);
        let interests = normalise(self.interests);
        let archetypes = normalise(self.archetypes);
        let age_scores = normalise(self.ages);

        let preferred_distance_km = (self.distance_count > 0)
            .then(|| self.distance_sum / self.distance_count as f64);

        LearnedPreferenceModel {
            user_id: user_id.to_owned(),
            preferred_age_range: preferred_age_range(&age_scores),
            preferred_distance_km,
            preferred_profile_types: above_threshold(&profile_types, TYPE_THRESHOLD),
            preferred_interests: top_n(&interests, TOP_INTERESTS, TAG_THRESHOLD),
            preferred_archetypes: top_n(&archetypes, TOP_ARCHETYPES, TAG_THRESHOLD),
            profile_types,
            interests,
            archetypes,
            age_scores,
            interaction_count: self.contributing,
            updated_at: now,
        }
    }
}

/// Divide every entry by the larger of 1 and the largest magnitude.
///
/// Maps whose entries all lie within `[-1, 1]` are returned unchanged.
#[expect(clippy::float_arithmetic, reason = "normalisation divides weights")]
fn normalise<K: Ord>(raw: BTreeMap<K, f64>) -> BTreeMap<K, f64> {
    let divisor = raw.values().map(|value| value.abs()).fold(1.0_f64, f64::max);
    raw.into_iter()
        .map(|(key, value)| (key, value / divisor))
        .collect()
}

/// Keys sorted by value descending; ties keep ascending key order.
fn ranked<K: Clone + Ord>(weights: &BTreeMap<K, f64>) -> Vec<(K, f64)> {
    let mut entries: Vec<(K, f64)> = weights
        .iter()
        .map(|(key, value)| (key.clone(), *value))
        .collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    entries
}

fn above_threshold(weights: &BTreeMap<String, f64>, threshold: f64) -> Vec<String> {
    ranked(weights)
        .into_iter()
        .filter(|(_, value)| *value > threshold)
        .map(|(key, _)| key)
        .collect()
}

/// Take the `n` strongest keys, then drop those not above `threshold`.
fn top_n(weights: &BTreeMap<String, f64>, n: usize, threshold: f64) -> Vec<String> {
    ranked(weights)
        .into_iter()
        .take(n)
        .filter(|(_, value)| *value > threshold)
        .map(|(key, _)| key)
        .collect()
}

fn preferred_age_range(age_scores: &BTreeMap<u32, f64>) -> Option<AgeRange> {
    let mut preferred = age_scores
        .iter()
        .filter(|(_, value)| **value > TYPE_THRESHOLD)
        .map(|(bucket, _)| *bucket);
    let min = preferred.next()?;
    let max = preferred.last().unwrap_or(min);
    Some(AgeRange {
        min,
        max: max.saturating_add(AGE_BUCKET_YEARS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::test_support::{FailingStore, MemoryStore};
    use beacon_core::{InteractionKind, NewInteraction};
    use chrono::Duration;
    use rstest::{fixture, rstest};

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000)
    }

    fn event(target: &str, kind: InteractionKind, days_ago: i64) -> NewInteraction {
        NewInteraction {
            user_id: "ada".into(),
            target_id: target.into(),
            kind,
            created_at: now() - Duration::days(days_ago),
            distance_km: None,
            location: None,
            duration_seconds: None,
            metadata: serde_json::Value::Null,
        }
    }

    fn typed(id: &str, kind: &str, age: u32) -> CandidateProfile {
        CandidateProfile {
            profile_type: Some(kind.into()),
            age: Some(age),
            ..CandidateProfile::new(id)
        }
    }

    #[fixture]
    fn store() -> MemoryStore {
        MemoryStore::with_profiles([
            typed("creator", "creator", 27),
            typed("organizer", "organizer", 33),
            CandidateProfile::new("musician").with_tags(["music", "jazz"]),
        ])
    }

    fn append(store: &MemoryStore, events: impl IntoIterator<Item = NewInteraction>) {
        for new in events {
            store.append_interaction(new).expect("append");
        }
    }

    fn learn(store: &MemoryStore) -> LearnedPreferenceModel {
        let outcome = PreferenceLearner::new(store, store, store)
            .learn_at("ada", now())
            .expect("learning succeeds");
        outcome.model().cloned().expect("model learned")
    }

    #[rstest]
    fn no_history_persists_nothing(store: MemoryStore) {
        let outcome = PreferenceLearner::new(&store, &store, &store)
            .learn_at("ada", now())
            .expect("learning succeeds");
        assert_eq!(outcome, LearnOutcome::NoInteractions);
        assert!(store.preferences("ada").expect("read").is_none());
    }

    #[rstest]
    fn likes_yield_preferred_type_and_age_range(store: MemoryStore) {
        append(
            &store,
            [
                event("creator", InteractionKind::Like, 0),
                event("organizer", InteractionKind::Like, 0),
            ],
        );
        let model = learn(&store);
        assert_eq!(model.preferred_profile_types, ["creator", "organizer"]);
        assert_eq!(model.preferred_age_range, Some(AgeRange { min: 25, max: 35 }));
        assert_eq!(model.age_scores.get(&25), Some(&1.0));
        assert_eq!(model.interaction_count, 2);
        assert_eq!(store.preferences("ada").expect("read"), Some(model));
    }

    #[rstest]
    fn blocks_push_a_type_below_the_threshold(store: MemoryStore) {
        append(&store, [event("creator", InteractionKind::Like, 0)]);
        assert_eq!(learn(&store).preferred_profile_types, ["creator"]);

        append(&store, [event("creator", InteractionKind::Block, 0)]);
        let model = learn(&store);
        assert!(model.preferred_profile_types.is_empty());
        assert_eq!(model.profile_types.get("creator"), Some(&-1.0));
    }

    #[rstest]
    fn a_few_views_stay_below_every_threshold(store: MemoryStore) {
        append(
            &store,
            [
                event("creator", InteractionKind::View, 0),
                event("musician", InteractionKind::View, 0),
            ],
        );
        let model = learn(&store);
        assert!(model.preferred_profile_types.is_empty());
        assert!(model.preferred_interests.is_empty());
        assert!(model.preferred_age_range.is_none());
        assert_eq!(model.interests.get("music"), Some(&0.1));
    }

    #[rstest]
    #[expect(clippy::float_arithmetic, reason = "tests compare floating point values")]
    fn older_interactions_decay(store: MemoryStore) {
        append(&store, [event("musician", InteractionKind::Like, 10)]);
        let model = learn(&store);
        let music = model.interests.get("music").copied().unwrap_or_default();
        assert!((music - 0.98_f64.powi(10)).abs() < 1e-12);
    }

    #[rstest]
    fn future_events_are_not_amplified() {
        let weight = decayed_weight(1.0, now() + Duration::days(3), now(), 0.98);
        assert_eq!(weight, 1.0);
    }

    #[rstest]
    #[expect(clippy::float_arithmetic, reason = "tests compare floating point values")]
    fn decay_uses_fractional_days() {
        let weight = decayed_weight(2.0, now() - Duration::hours(12), now(), 0.98);
        assert!((weight - 2.0 * 0.98_f64.sqrt()).abs() < 1e-12);
    }

    #[rstest]
    #[expect(clippy::float_arithmetic, reason = "tests compare floating point values")]
    fn distance_averages_only_positive_interactions(store: MemoryStore) {
        let near = NewInteraction {
            distance_km: Some(2.0),
            ..event("creator", InteractionKind::Like, 0)
        };
        let mid = NewInteraction {
            distance_km: Some(4.0),
            ..event("organizer", InteractionKind::Message, 0)
        };
        let skipped = NewInteraction {
            distance_km: Some(500.0),
            ..event("musician", InteractionKind::Skip, 0)
        };
        append(&store, [near, mid, skipped]);
        let model = learn(&store);
        // (2.0 * 1.0 + 4.0 * 1.5) / 2
        let km = model.preferred_distance_km.unwrap_or_default();
        assert!((km - 4.0).abs() < 1e-12);
    }

    #[rstest]
    fn out_of_range_distances_are_ignored(store: MemoryStore) {
        let huge = NewInteraction {
            distance_km: Some(f64::MAX),
            ..event("creator", InteractionKind::Like, 0)
        };
        let near = NewInteraction {
            distance_km: Some(3.0),
            ..event("organizer", InteractionKind::Like, 0)
        };
        append(&store, [huge.clone(), huge, near]);
        assert_eq!(learn(&store).preferred_distance_km, Some(3.0));
    }

    #[rstest]
    fn unresolved_targets_are_skipped(store: MemoryStore) {
        append(
            &store,
            [
                event("ghost", InteractionKind::Meet, 0),
                event("creator", InteractionKind::Like, 0),
            ],
        );
        let model = learn(&store);
        assert_eq!(model.interaction_count, 1);
        assert_eq!(model.preferred_profile_types, ["creator"]);
    }

    #[rstest]
    fn only_unresolved_targets_keep_the_stored_model(store: MemoryStore) {
        append(&store, [event("creator", InteractionKind::Like, 1)]);
        let stored = learn(&store);

        let later = MemoryStore::default();
        later.save_preferences(&stored).expect("seed model");
        append(&later, [event("ghost", InteractionKind::Meet, 0)]);
        let outcome = PreferenceLearner::new(&later, &later, &later)
            .learn_at("ada", now())
            .expect("learning succeeds");

        assert_eq!(outcome, LearnOutcome::NoInteractions);
        assert_eq!(later.preferences("ada").expect("read"), Some(stored));
    }

    #[rstest]
    fn interests_are_truncated_before_filtering() {
        let weights: BTreeMap<String, f64> = (0..25)
            .map(|i| (format!("tag{i:02}"), if i == 24 { 1.0 } else { 0.5 }))
            .collect();
        let top = top_n(&weights, TOP_INTERESTS, TAG_THRESHOLD);
        assert_eq!(top.len(), 20);
        assert_eq!(top.first().map(String::as_str), Some("tag24"));
        assert_eq!(top.last().map(String::as_str), Some("tag18"));
    }

    #[rstest]
    fn truncation_happens_before_threshold() {
        let weights: BTreeMap<String, f64> = BTreeMap::from([
            ("a".to_owned(), 0.9),
            ("b".to_owned(), 0.1),
            ("c".to_owned(), 0.5),
        ]);
        assert_eq!(top_n(&weights, 2, TAG_THRESHOLD), ["a", "c"]);
        assert_eq!(top_n(&weights, 1, 0.95), Vec::<String>::new());
    }

    #[rstest]
    fn normalisation_only_shrinks_large_maps() {
        let small = normalise(BTreeMap::from([(1_u32, 0.5), (2, -0.25)]));
        assert_eq!(small, BTreeMap::from([(1, 0.5), (2, -0.25)]));
        let large = normalise(BTreeMap::from([(1_u32, 4.0), (2, -2.0)]));
        assert_eq!(large, BTreeMap::from([(1, 1.0), (2, -0.5)]));
    }

    #[rstest]
    fn relearning_is_idempotent(store: MemoryStore) {
        append(
            &store,
            [
                event("creator", InteractionKind::Meet, 3),
                event("musician", InteractionKind::Save, 1),
                event("organizer", InteractionKind::Skip, 2),
            ],
        );
        assert_eq!(learn(&store), learn(&store));
    }

    #[rstest]
    fn batch_counts_learned_users(store: MemoryStore) {
        append(&store, [event("creator", InteractionKind::Like, 0)]);
        append(
            &store,
            [NewInteraction {
                user_id: "grace".into(),
                ..event("musician", InteractionKind::Like, 0)
            }],
        );
        let summary = PreferenceLearner::new(&store, &store, &store)
            .learn_all_at(now())
            .expect("batch");
        assert_eq!(
            summary,
            BatchSummary {
                learned: 2,
                skipped: 0,
                failed: 0
            }
        );
    }

    #[rstest]
    fn batch_continues_past_failures(store: MemoryStore) {
        append(&store, [event("creator", InteractionKind::Like, 0)]);
        let summary = PreferenceLearner::new(&store, &store, FailingStore)
            .learn_all_at(now())
            .expect("batch");
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.learned, 0);
    }

    #[rstest]
    fn failed_save_propagates(store: MemoryStore) {
        append(&store, [event("creator", InteractionKind::Like, 0)]);
        let err = PreferenceLearner::new(&store, &store, FailingStore)
            .learn_at("ada", now())
            .expect_err("save fails");
        assert!(matches!(err, EngineError::Storage(_)));
    }
}
