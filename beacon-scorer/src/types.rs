//! Request, response, and configuration types for the engine operations.
#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::time::Duration;

use beacon_core::{CandidateProfile, InteractionKind, LearnedPreferenceModel};
use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Integer sub-scores produced by the geo and attribute scorers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentScores {
    /// Proximity bucket score, `5..=30`.
    pub distance: u32,
    /// Interest overlap score, `0..=25`.
    pub interest: u32,
    /// Recency score, `2..=15`.
    pub activity: u32,
    /// Profile completeness score, `0..=10`.
    pub completeness: u32,
    /// Essentials and dealbreakers score, `0..=20`.
    pub compatibility: u32,
}

impl ComponentScores {
    /// Sum of the five components.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.distance + self.interest + self.activity + self.completeness + self.compatibility
    }
}

/// Per-candidate explanation of how the overall score was reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// Attribute sub-scores.
    #[serde(flatten)]
    pub components: ComponentScores,
    /// Preference-model bonus, present only when a model was applied.
    pub ml: Option<f64>,
    /// Sum of every present term.
    pub overall: f64,
    /// Distance between viewer and candidate, when both locations are known.
    pub distance_km: Option<f64>,
}

impl ScoreBreakdown {
    /// Combine the components with an optional model bonus.
    ///
    /// # Examples
    /// ```
    /// use beacon_scorer::{ComponentScores, ScoreBreakdown};
    ///
    /// let components = ComponentScores { distance: 27, interest: 13, activity: 5, completeness: 8, compatibility: 3 };
    /// assert_eq!(ScoreBreakdown::new(components, None, Some(1.8)).overall, 56.0);
    /// assert_eq!(ScoreBreakdown::new(components, Some(4.5), None).overall, 60.5);
    /// ```
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "overall adds the fractional model bonus")]
    pub fn new(components: ComponentScores, ml: Option<f64>, distance_km: Option<f64>) -> Self {
        let overall = f64::from(components.total()) + ml.unwrap_or(0.0);
        Self {
            components,
            ml,
            overall,
            distance_km,
        }
    }

    /// Overall score rounded to the nearest integer.
    ///
    /// The value is not a true percentage: the terms can sum past 100.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "overall is a small non-negative sum of bounded terms"
    )]
    pub fn match_percentage(&self) -> u32 {
        self.overall.round() as u32
    }
}

/// Public subset of a candidate profile returned with a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    /// Candidate identity.
    pub id: String,
    /// Name shown in the feed.
    pub display_name: Option<String>,
    /// City, when shared.
    pub city: Option<String>,
    /// Declared profile type.
    pub profile_type: Option<String>,
    /// Interests and tags.
    pub tags: BTreeSet<String>,
    /// First photo, used as the card image.
    pub photo: Option<String>,
    /// Whether any verification flag is set.
    pub verified: bool,
}

impl From<&CandidateProfile> for ProfileSummary {
    fn from(profile: &CandidateProfile) -> Self {
        Self {
            id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            city: profile.city.clone(),
            profile_type: profile.profile_type.clone(),
            tags: profile.tags.clone(),
            photo: profile.photos.first().cloned(),
            verified: profile.is_verified(),
        }
    }
}

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Candidate summary.
    pub profile: ProfileSummary,
    /// Score explanation.
    pub scores: ScoreBreakdown,
    /// `round(overall)`.
    pub match_percentage: u32,
}

impl Recommendation {
    /// Pair a candidate with its scores.
    #[must_use]
    pub fn new(profile: &CandidateProfile, scores: ScoreBreakdown) -> Self {
        Self {
            profile: ProfileSummary::from(profile),
            match_percentage: scores.match_percentage(),
            scores,
        }
    }
}

/// Parameters of a recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendationQuery {
    /// Latitude overriding the viewer's stored location.
    pub lat: Option<f64>,
    /// Longitude overriding the viewer's stored location.
    pub lng: Option<f64>,
    /// Requested page size; clamped to the ranker's maximum.
    pub limit: Option<usize>,
    /// Number of ranked candidates to skip.
    pub offset: usize,
    /// Candidates scoring below this are dropped before pagination.
    pub min_score: f64,
    /// Drop candidates the viewer has blocked.
    pub exclude_blocked: bool,
}

impl Default for RecommendationQuery {
    fn default() -> Self {
        Self {
            lat: None,
            lng: None,
            limit: None,
            offset: 0,
            min_score: 0.0,
            exclude_blocked: true,
        }
    }
}

impl RecommendationQuery {
    /// Check the query and return the location override, if any.
    ///
    /// # Errors
    /// Returns [`EngineError::Validation`] when `min_score` is negative or not
    /// finite, or when only one override coordinate is given or either is not
    /// finite.
    pub fn validate(&self) -> Result<Option<Coord<f64>>, EngineError> {
        if !self.min_score.is_finite() || self.min_score < 0.0 {
            return Err(EngineError::validation(
                "minScore",
                "must be a finite number >= 0",
            ));
        }
        location_override(self.lat, self.lng)
    }
}

/// Pair an optional latitude and longitude into a coordinate.
pub(crate) fn location_override(
    lat: Option<f64>,
    lng: Option<f64>,
) -> Result<Option<Coord<f64>>, EngineError> {
    match (lat, lng) {
        (None, None) => Ok(None),
        (Some(y), Some(x)) if y.is_finite() && x.is_finite() => Ok(Some(Coord { x, y })),
        (Some(_), Some(_)) => Err(EngineError::validation(
            "location",
            "latitude and longitude must be finite",
        )),
        (Some(_), None) => Err(EngineError::validation("lng", "required when lat is given")),
        (None, Some(_)) => Err(EngineError::validation("lat", "required when lng is given")),
    }
}

/// One page of ranked candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationPage {
    /// Ranked candidates in this page.
    pub recommendations: Vec<Recommendation>,
    /// Candidates that passed filtering, before pagination.
    pub total: usize,
    /// Offset applied.
    pub offset: usize,
    /// Effective page size after clamping.
    pub limit: usize,
    /// Whether candidates remain beyond this page.
    pub has_more: bool,
    /// Whether a learned preference model contributed.
    pub ml_enabled: bool,
    /// Entries across the model's preferred types, interests, and archetypes.
    pub preference_count: usize,
}

/// Tunables for [`CandidateRanker`](crate::CandidateRanker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankerConfig {
    /// Hard ceiling on the page size.
    pub max_limit: usize,
    /// Page size used when the caller gives none.
    pub default_limit: usize,
    /// Whether stored preference models are applied.
    pub ml_enabled: bool,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            max_limit: 50,
            default_limit: 20,
            ml_enabled: true,
        }
    }
}

impl RankerConfig {
    /// Resolve the requested page size into `1..=max_limit`.
    ///
    /// # Examples
    /// ```
    /// use beacon_scorer::RankerConfig;
    ///
    /// let config = RankerConfig::default();
    /// assert_eq!(config.effective_limit(None), 20);
    /// assert_eq!(config.effective_limit(Some(500)), 50);
    /// assert_eq!(config.effective_limit(Some(0)), 1);
    /// ```
    #[must_use]
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
            .max(1)
    }
}

/// Tunables for [`PreferenceLearner`](crate::PreferenceLearner).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearnerConfig {
    /// Maximum number of recent interactions read per user.
    pub history_limit: usize,
    /// Fraction of an interaction's weight kept per day of age.
    pub decay_per_day: f64,
    /// Delay between users in a batch run.
    pub pacing: Duration,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            history_limit: 500,
            decay_per_day: 0.98,
            pacing: Duration::ZERO,
        }
    }
}

/// Interaction submitted by an authenticated actor.
///
/// `targetId` and `type` are required when decoding; everything else is
/// optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInteraction {
    /// Subject of the interaction.
    pub target_id: String,
    /// Interaction type; unknown values are stored verbatim.
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    /// Distance between the two users at the time, in kilometres.
    #[serde(default)]
    pub distance_km: Option<f64>,
    /// Actor latitude.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Actor longitude.
    #[serde(default)]
    pub lng: Option<f64>,
    /// How long the interaction lasted.
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    /// Free-form caller metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Result of one learning run.
#[derive(Debug, Clone, PartialEq)]
pub enum LearnOutcome {
    /// A model was computed and persisted.
    Learned(Box<LearnedPreferenceModel>),
    /// The user has no interactions; nothing was persisted.
    NoInteractions,
}

impl LearnOutcome {
    /// Caller-facing description of the outcome.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Learned(_) => "Preferences learned successfully",
            Self::NoInteractions => "Not enough interactions to learn preferences",
        }
    }

    /// Borrow the learned model, if any.
    #[must_use]
    pub fn model(&self) -> Option<&LearnedPreferenceModel> {
        match self {
            Self::Learned(model) => Some(model.as_ref()),
            Self::NoInteractions => None,
        }
    }
}

/// Tally of a batch learning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Users whose model was persisted.
    pub learned: usize,
    /// Users with nothing to learn from.
    pub skipped: usize,
    /// Users whose run failed.
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, 20)]
    #[case(Some(0), 1)]
    #[case(Some(7), 7)]
    #[case(Some(50), 50)]
    #[case(Some(51), 50)]
    fn limits_are_clamped(#[case] requested: Option<usize>, #[case] expected: usize) {
        assert_eq!(RankerConfig::default().effective_limit(requested), expected);
    }

    #[rstest]
    fn zero_max_limit_still_yields_one() {
        let config = RankerConfig {
            max_limit: 0,
            ..RankerConfig::default()
        };
        assert_eq!(config.effective_limit(Some(10)), 1);
    }

    #[rstest]
    #[case(Some(51.5), None, "lng")]
    #[case(None, Some(-0.1), "lat")]
    #[case(Some(f64::NAN), Some(-0.1), "location")]
    fn partial_or_invalid_overrides_are_rejected(
        #[case] lat: Option<f64>,
        #[case] lng: Option<f64>,
        #[case] field: &str,
    ) {
        let query = RecommendationQuery {
            lat,
            lng,
            ..RecommendationQuery::default()
        };
        let err = query.validate().expect_err("invalid override");
        assert!(
            matches!(err, EngineError::Validation { field: f, .. } if f == field),
            "unexpected error: {err:?}"
        );
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::INFINITY)]
    #[case(f64::NAN)]
    fn bad_min_score_is_rejected(#[case] min_score: f64) {
        let query = RecommendationQuery {
            min_score,
            ..RecommendationQuery::default()
        };
        assert!(matches!(
            query.validate(),
            Err(EngineError::Validation { field: "minScore", .. })
        ));
    }

    #[rstest]
    fn override_maps_lat_to_y() {
        let query = RecommendationQuery {
            lat: Some(51.5),
            lng: Some(-0.1),
            ..RecommendationQuery::default()
        };
        assert_eq!(
            query.validate().expect("valid query"),
            Some(Coord { x: -0.1, y: 51.5 })
        );
    }

    #[rstest]
    fn query_json_defaults_to_excluding_blocked() {
        let query: RecommendationQuery = serde_json::from_str(r#"{"limit":5}"#).expect("json");
        assert!(query.exclude_blocked);
        assert_eq!(query.limit, Some(5));
    }

    #[rstest]
    fn breakdown_serialises_flat_camel_case() {
        let components = ComponentScores {
            distance: 27,
            interest: 13,
            activity: 5,
            completeness: 8,
            compatibility: 3,
        };
        let json = serde_json::to_value(ScoreBreakdown::new(components, None, Some(1.5)))
            .expect("serialise breakdown");
        assert_eq!(json["distance"], 27);
        assert_eq!(json["distanceKm"], 1.5);
        assert_eq!(json["overall"], 56.0);
        assert!(json["ml"].is_null());
    }

    #[rstest]
    fn record_request_requires_type() {
        let missing = serde_json::from_str::<RecordInteraction>(r#"{"targetId":"b"}"#);
        assert!(missing.is_err());
        let request: RecordInteraction =
            serde_json::from_str(r#"{"targetId":"b","type":"meet","durationSeconds":60}"#)
                .expect("json");
        assert_eq!(request.kind, InteractionKind::Meet);
        assert!(request.metadata.is_null());
    }

    #[rstest]
    fn outcome_messages_differ() {
        assert_ne!(
            LearnOutcome::NoInteractions.message(),
            LearnOutcome::Learned(Box::new(LearnedPreferenceModel::empty(
                "user",
                chrono::DateTime::<chrono::Utc>::UNIX_EPOCH
            )))
            .message()
        );
    }
}
