//! Learned preference models.
//!
//! A model is the persisted output of one learning run for one user. It is
//! replaced wholesale on every run and read back at ranking time.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Width of an age bucket in years.
pub const AGE_BUCKET_YEARS: u32 = 5;

/// Map an age onto the lower bound of its five-year bucket.
///
/// # Examples
/// ```
/// use beacon_core::age_bucket;
///
/// assert_eq!(age_bucket(29), 25);
/// assert_eq!(age_bucket(30), 30);
/// ```
#[must_use]
#[expect(
    clippy::integer_division_remainder_used,
    reason = "bucketing floors the age to a multiple of the bucket width"
)]
pub const fn age_bucket(age: u32) -> u32 {
    age - age % AGE_BUCKET_YEARS
}

/// Half-open age interval `[min, max)` in years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    /// Inclusive lower bound.
    pub min: u32,
    /// Exclusive upper bound.
    pub max: u32,
}

impl AgeRange {
    /// Report whether `age` falls inside the range.
    #[must_use]
    pub const fn contains(&self, age: u32) -> bool {
        age >= self.min && age < self.max
    }
}

/// Per-user preference model derived from interaction history.
///
/// The weight maps hold normalised values in `[-1.0, 1.0]`. The derived
/// `preferred_*` lists are computed from those normalised maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnedPreferenceModel {
    /// Owner of the model.
    pub user_id: String,
    /// Ages the user responds to, when any bucket stood out.
    pub preferred_age_range: Option<AgeRange>,
    /// Typical distance of positively received profiles, in kilometres.
    pub preferred_distance_km: Option<f64>,
    /// Profile types above the inclusion threshold.
    pub preferred_profile_types: Vec<String>,
    /// Strongest interests, best first.
    pub preferred_interests: Vec<String>,
    /// Strongest archetypes, best first.
    pub preferred_archetypes: Vec<String>,
    /// Normalised weights keyed by profile type.
    pub profile_types: BTreeMap<String, f64>,
    /// Normalised weights keyed by interest.
    pub interests: BTreeMap<String, f64>,
    /// Normalised weights keyed by archetype.
    pub archetypes: BTreeMap<String, f64>,
    /// Normalised weights keyed by age bucket lower bound.
    pub age_scores: BTreeMap<u32, f64>,
    /// Number of interactions that contributed.
    pub interaction_count: usize,
    /// When the model was computed.
    pub updated_at: DateTime<Utc>,
}

impl LearnedPreferenceModel {
    /// Construct an empty model for `user_id`.
    #[must_use]
    pub fn empty(user_id: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            preferred_age_range: None,
            preferred_distance_km: None,
            preferred_profile_types: Vec::new(),
            preferred_interests: Vec::new(),
            preferred_archetypes: Vec::new(),
            profile_types: BTreeMap::new(),
            interests: BTreeMap::new(),
            archetypes: BTreeMap::new(),
            age_scores: BTreeMap::new(),
            interaction_count: 0,
            updated_at,
        }
    }

    /// Count the entries across the derived preference lists.
    #[must_use]
    pub fn preference_count(&self) -> usize {
        self.preferred_profile_types.len()
            + self.preferred_interests.len()
            + self.preferred_archetypes.len()
    }
}
