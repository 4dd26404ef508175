//! Candidate ranking: score, filter, sort, and paginate one viewer's feed.
//!
//! Each request performs one bulk read of visible profiles and scores the
//! whole set in memory. Cost is linear in the candidate count, not in the
//! page size.

use std::collections::BTreeSet;

use beacon_core::{CandidateProfile, LearnedPreferenceModel, PreferenceStore, ProfileStore};
use chrono::{DateTime, Utc};
use geo::Coord;
use log::debug;

use crate::attributes::{activity_score, compatibility_score, completeness_score, interest_score};
use crate::error::{EngineError, authenticated};
use crate::ml::MlScorer;
use crate::proximity::{distance_km, distance_score};
use crate::types::{
    ComponentScores, RankerConfig, Recommendation, RecommendationPage, RecommendationQuery,
    ScoreBreakdown,
};

/// Score one candidate for one viewer.
///
/// `origin` is the viewer's effective location (override or stored). When a
/// model is supplied its bonus is added to `overall`; otherwise `ml` is
/// `None` and `overall` is the sum of the five components.
#[must_use]
pub fn score_candidate(
    viewer: &CandidateProfile,
    origin: Option<Coord<f64>>,
    candidate: &CandidateProfile,
    model: Option<&LearnedPreferenceModel>,
    now: DateTime<Utc>,
) -> ScoreBreakdown {
    let km = distance_km(origin, candidate.location);
    let components = ComponentScores {
        distance: distance_score(km),
        interest: interest_score(&viewer.tags, &candidate.tags),
        activity: activity_score(candidate.last_seen, now),
        completeness: completeness_score(candidate),
        compatibility: compatibility_score(viewer, candidate),
    };
    let ml = model.map(|m| MlScorer.score(candidate, Some(m)));
    ScoreBreakdown::new(components, ml, km)
}

/// Ranks visible profiles for a viewer.
///
/// # Examples
/// ```
/// use beacon_core::CandidateProfile;
/// use beacon_core::test_support::MemoryStore;
/// use beacon_scorer::{CandidateRanker, RecommendationQuery};
///
/// let store = MemoryStore::with_profiles([
///     CandidateProfile::new("viewer").with_location(51.5, -0.1),
///     CandidateProfile::new("near").with_location(51.501, -0.1),
///     CandidateProfile::new("far").with_location(48.85, 2.35),
/// ]);
/// let ranker = CandidateRanker::new(&store, &store);
/// let page = ranker.recommend("viewer", &RecommendationQuery::default())?;
/// assert_eq!(page.total, 2);
/// assert_eq!(page.recommendations[0].profile.id, "near");
/// # Ok::<(), beacon_scorer::EngineError>(())
/// ```
#[derive(Debug)]
pub struct CandidateRanker<P, M> {
    profiles: P,
    models: M,
    config: RankerConfig,
}

impl<P, M> CandidateRanker<P, M>
where
    P: ProfileStore,
    M: PreferenceStore,
{
    /// Build a ranker with the default configuration.
    pub fn new(profiles: P, models: M) -> Self {
        Self::with_config(profiles, models, RankerConfig::default())
    }

    /// Build a ranker with explicit tunables.
    pub const fn with_config(profiles: P, models: M, config: RankerConfig) -> Self {
        Self {
            profiles,
            models,
            config,
        }
    }

    /// Return the active configuration.
    #[must_use]
    pub const fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Rank candidates for `viewer_id` as of now.
    ///
    /// # Errors
    /// See [`CandidateRanker::recommend_at`].
    pub fn recommend(
        &self,
        viewer_id: &str,
        query: &RecommendationQuery,
    ) -> Result<RecommendationPage, EngineError> {
        self.recommend_at(viewer_id, query, Utc::now())
    }

    /// Rank candidates for `viewer_id` with an explicit clock.
    ///
    /// # Errors
    /// - [`EngineError::Authentication`] when `viewer_id` is blank.
    /// - [`EngineError::Validation`] when the query is malformed.
    /// - [`EngineError::NotFound`] when the viewer has no profile.
    /// - [`EngineError::Storage`] when any store call fails; no partial page
    ///   is returned.
    pub fn recommend_at(
        &self,
        viewer_id: &str,
        query: &RecommendationQuery,
        now: DateTime<Utc>,
    ) -> Result<RecommendationPage, EngineError> {
        let actor = authenticated(viewer_id)?;
        let location_override = query.validate()?;
        let viewer = self
            .profiles
            .profile(actor)?
            .ok_or_else(|| EngineError::profile_not_found(actor))?;

        let blocked = if query.exclude_blocked {
            self.profiles.blocked_ids(actor)?
        } else {
            BTreeSet::new()
        };
        let model = if self.config.ml_enabled {
            self.models.preferences(actor)?
        } else {
            None
        };
        let candidates = self.profiles.visible_profiles()?;
        let fetched = candidates.len();

        let eligible: Vec<&CandidateProfile> = candidates
            .iter()
            .filter(|c| c.id != viewer.id && !blocked.contains(&c.id))
            .collect();
        let origin = location_override.or(viewer.location);
        let page = rank(
            &viewer,
            origin,
            &eligible,
            model.as_ref(),
            query,
            self.config.effective_limit(query.limit),
            now,
        );
        debug!(
            "ranked {} of {} fetched candidates for {} (total {}, ml {})",
            eligible.len(),
            fetched,
            viewer.id,
            page.total,
            page.ml_enabled
        );
        Ok(page)
    }
}

/// Score, filter, sort, and paginate an already-fetched candidate set.
///
/// Sorting is stable and descending by `overall`, so equal scores keep the
/// order in which candidates were supplied.
#[must_use]
pub fn rank(
    viewer: &CandidateProfile,
    origin: Option<Coord<f64>>,
    candidates: &[&CandidateProfile],
    model: Option<&LearnedPreferenceModel>,
    query: &RecommendationQuery,
    limit: usize,
    now: DateTime<Utc>,
) -> RecommendationPage {
    let mut scored: Vec<Recommendation> = candidates
        .iter()
        .map(|candidate| {
            let scores = score_candidate(viewer, origin, candidate, model, now);
            Recommendation::new(candidate, scores)
        })
        .filter(|rec| rec.scores.overall >= query.min_score)
        .collect();
    scored.sort_by(|a, b| b.scores.overall.total_cmp(&a.scores.overall));

    let total = scored.len();
    let recommendations: Vec<Recommendation> =
        scored.into_iter().skip(query.offset).take(limit).collect();
    let has_more = query.offset.saturating_add(recommendations.len()) < total;

    RecommendationPage {
        recommendations,
        total,
        offset: query.offset,
        limit,
        has_more,
        ml_enabled: model.is_some(),
        preference_count: model.map_or(0, LearnedPreferenceModel::preference_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::test_support::{FailingStore, MemoryStore};
    use chrono::Duration;
    use rstest::{fixture, rstest};

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000)
    }

    fn candidate(id: &str, lat: f64) -> CandidateProfile {
        CandidateProfile::new(id).with_location(lat, 0.0)
    }

    #[fixture]
    fn store() -> MemoryStore {
        // Latitude steps of ~0.02 degrees (~2.2 km) move candidates across buckets.
        MemoryStore::with_profiles([
            candidate("viewer", 0.0),
            candidate("a", 0.001),
            candidate("b", 0.02),
            candidate("c", 0.04),
            candidate("d", 0.08),
            candidate("e", 0.2),
        ])
    }

    fn ids(page: &RecommendationPage) -> Vec<&str> {
        page.recommendations
            .iter()
            .map(|r| r.profile.id.as_str())
            .collect()
    }

    #[rstest]
    fn ranks_by_descending_overall(store: MemoryStore) {
        let ranker = CandidateRanker::new(&store, &store);
        let page = ranker
            .recommend_at("viewer", &RecommendationQuery::default(), now())
            .expect("ranking succeeds");
        assert_eq!(ids(&page), ["a", "b", "c", "d", "e"]);
        assert!(!page.has_more);
        assert_eq!(page.total, 5);
        assert!(!page.ml_enabled);
        assert_eq!(page.preference_count, 0);
    }

    #[rstest]
    fn paginates_after_sorting(store: MemoryStore) {
        let ranker = CandidateRanker::new(&store, &store);
        let query = RecommendationQuery {
            limit: Some(2),
            offset: 1,
            ..RecommendationQuery::default()
        };
        let page = ranker.recommend_at("viewer", &query, now()).expect("page");
        assert_eq!(ids(&page), ["b", "c"]);
        assert_eq!(page.total, 5);
        assert!(page.has_more);
        assert_eq!(page.limit, 2);
    }

    #[rstest]
    fn offset_past_end_yields_empty_page(store: MemoryStore) {
        let ranker = CandidateRanker::new(&store, &store);
        let query = RecommendationQuery {
            offset: 10,
            ..RecommendationQuery::default()
        };
        let page = ranker.recommend_at("viewer", &query, now()).expect("page");
        assert!(page.recommendations.is_empty());
        assert_eq!(page.total, 5);
        assert!(!page.has_more);
    }

    #[rstest]
    fn min_score_filters_before_counting(store: MemoryStore) {
        let ranker = CandidateRanker::new(&store, &store);
        // Every candidate has 27 points before distance; a scores 30 and b 27.
        let query = RecommendationQuery {
            min_score: 53.0,
            ..RecommendationQuery::default()
        };
        let page = ranker.recommend_at("viewer", &query, now()).expect("page");
        assert_eq!(ids(&page), ["a", "b"]);
        assert_eq!(page.total, 2);
    }

    #[rstest]
    fn blocked_candidates_are_excluded_unless_disabled(mut store: MemoryStore) {
        store.block("viewer", "a");
        let ranker = CandidateRanker::new(&store, &store);
        let page = ranker
            .recommend_at("viewer", &RecommendationQuery::default(), now())
            .expect("page");
        assert!(!ids(&page).contains(&"a"));

        let unfiltered = RecommendationQuery {
            exclude_blocked: false,
            ..RecommendationQuery::default()
        };
        let everyone = ranker
            .recommend_at("viewer", &unfiltered, now())
            .expect("page");
        assert_eq!(ids(&everyone).first(), Some(&"a"));
    }

    #[rstest]
    fn override_location_replaces_stored_location(store: MemoryStore) {
        let ranker = CandidateRanker::new(&store, &store);
        let query = RecommendationQuery {
            lat: Some(0.2),
            lng: Some(0.0),
            ..RecommendationQuery::default()
        };
        let page = ranker.recommend_at("viewer", &query, now()).expect("page");
        assert_eq!(ids(&page).first(), Some(&"e"));
    }

    #[rstest]
    fn ties_keep_fetch_order() {
        let store = MemoryStore::with_profiles([
            CandidateProfile::new("viewer"),
            CandidateProfile::new("z"),
            CandidateProfile::new("m"),
            CandidateProfile::new("a"),
        ]);
        let ranker = CandidateRanker::new(&store, &store);
        let page = ranker
            .recommend_at("viewer", &RecommendationQuery::default(), now())
            .expect("page");
        assert_eq!(ids(&page), ["z", "m", "a"]);
        assert!(page.recommendations.iter().all(|r| r.scores.distance_km.is_none()));
    }

    #[rstest]
    fn stored_model_adds_ml_term(store: MemoryStore) {
        let mut model = LearnedPreferenceModel::empty("viewer", now());
        model.preferred_interests = vec!["music".into()];
        beacon_core::PreferenceStore::save_preferences(&store, &model).expect("save model");
        let ranker = CandidateRanker::new(&store, &store);
        let page = ranker
            .recommend_at("viewer", &RecommendationQuery::default(), now())
            .expect("page");
        assert!(page.ml_enabled);
        assert_eq!(page.preference_count, 1);
        assert!(page.recommendations.iter().all(|r| r.scores.ml == Some(0.0)));
    }

    #[rstest]
    fn disabled_ml_ignores_stored_model(store: MemoryStore) {
        let model = LearnedPreferenceModel::empty("viewer", now());
        beacon_core::PreferenceStore::save_preferences(&store, &model).expect("save model");
        let config = RankerConfig {
            ml_enabled: false,
            ..RankerConfig::default()
        };
        let ranker = CandidateRanker::with_config(&store, &store, config);
        let page = ranker
            .recommend_at("viewer", &RecommendationQuery::default(), now())
            .expect("page");
        assert!(!page.ml_enabled);
        assert!(page.recommendations.iter().all(|r| r.scores.ml.is_none()));
    }

    #[rstest]
    fn missing_viewer_is_not_found(store: MemoryStore) {
        let ranker = CandidateRanker::new(&store, &store);
        let err = ranker
            .recommend_at("ghost", &RecommendationQuery::default(), now())
            .expect_err("unknown viewer");
        assert!(matches!(err, EngineError::NotFound { entity: "profile", .. }));
    }

    #[rstest]
    fn blank_viewer_is_unauthenticated(store: MemoryStore) {
        let ranker = CandidateRanker::new(&store, &store);
        let err = ranker
            .recommend_at("  ", &RecommendationQuery::default(), now())
            .expect_err("blank viewer");
        assert!(matches!(err, EngineError::Authentication));
    }

    #[rstest]
    fn storage_failure_aborts_request() {
        let ranker = CandidateRanker::new(FailingStore, FailingStore);
        let err = ranker
            .recommend_at("viewer", &RecommendationQuery::default(), now())
            .expect_err("failing store");
        assert!(matches!(err, EngineError::Storage(_)));
    }

    #[rstest]
    fn viewer_alone_gets_empty_page() {
        let store = MemoryStore::with_profiles([CandidateProfile::new("viewer")]);
        let ranker = CandidateRanker::new(&store, &store);
        let page = ranker
            .recommend_at("viewer", &RecommendationQuery::default(), now())
            .expect("page");
        assert!(page.recommendations.is_empty());
        assert_eq!(page.total, 0);
    }
}
