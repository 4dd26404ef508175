//! Preference-model bonus applied on top of the attribute scores.

use beacon_core::{CandidateProfile, LearnedPreferenceModel, age_bucket};

/// Upper bound of the bonus.
pub const MAX_ML_SCORE: f64 = 20.0;

const PROFILE_TYPE_FACTOR: f64 = 15.0;
const INTEREST_FACTOR: f64 = 5.0;
const ARCHETYPE_FACTOR: f64 = 8.0;
const AGE_FACTOR: f64 = 10.0;

/// Scores candidates against a learned preference model.
///
/// The sum of weighted terms is clamped only at the end, so a candidate
/// overlapping many liked interests reaches the ceiling quickly.
#[derive(Debug, Clone, Copy, Default)]
pub struct MlScorer;

impl MlScorer {
    /// Return the bonus in `0.0..=20.0`; `None` for the model yields `0.0`.
    ///
    /// # Examples
    /// ```
    /// use beacon_core::{CandidateProfile, LearnedPreferenceModel};
    /// use beacon_scorer::MlScorer;
    /// use chrono::Utc;
    ///
    /// let mut model = LearnedPreferenceModel::empty("viewer", Utc::now());
    /// model.interests.insert("music".into(), 1.0);
    /// let candidate = CandidateProfile::new("c").with_tags(["music"]);
    /// assert_eq!(MlScorer.score(&candidate, Some(&model)), 5.0);
    /// assert_eq!(MlScorer.score(&candidate, None), 0.0);
    /// ```
    #[must_use]
    pub fn score(self, candidate: &CandidateProfile, model: Option<&LearnedPreferenceModel>) -> f64 {
        model.map_or(0.0, |m| ml_score(candidate, m))
    }
}

/// Compute the raw model bonus for one candidate, clamped to `0.0..=20.0`.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "the bonus is a weighted sum of normalised weights"
)]
pub fn ml_score(candidate: &CandidateProfile, model: &LearnedPreferenceModel) -> f64 {
    let profile_type = candidate
        .profile_type
        .as_ref()
        .and_then(|kind| model.profile_types.get(kind))
        .copied()
        .unwrap_or(0.0);
    let interests: f64 = candidate
        .tags
        .iter()
        .filter_map(|tag| model.interests.get(tag))
        .sum();
    let archetypes: f64 = candidate
        .archetypes
        .iter()
        .filter_map(|archetype| model.archetypes.get(archetype))
        .sum();
    let age = candidate
        .age
        .and_then(|years| model.age_scores.get(&age_bucket(years)))
        .copied()
        .unwrap_or(0.0);

    let raw = profile_type * PROFILE_TYPE_FACTOR
        + interests * INTEREST_FACTOR
        + archetypes * ARCHETYPE_FACTOR
        + age * AGE_FACTOR;
    sanitise(raw)
}

const fn sanitise(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, MAX_ML_SCORE)
    } else {
        0.0
    }
}
