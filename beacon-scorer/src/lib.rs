//! Scoring and preference learning for the Beacon discovery feed.
//!
//! The crate provides two pipelines that meet only through a persisted
//! [`LearnedPreferenceModel`](beacon_core::LearnedPreferenceModel):
//! - **Ranking** scores every visible candidate for a viewer with bucketed
//!   proximity, interest overlap, recency, completeness, and
//!   essentials/dealbreakers compatibility. It adds a bounded bonus from the
//!   viewer's learned model when one exists, then sorts and paginates.
//! - **Learning** turns a user's recent interactions into normalised weight
//!   maps over profile types, interests, archetypes, and age buckets, with
//!   exponential decay by age and a fixed weight per interaction kind.
//!
//! Storage is injected through the `beacon-core` traits, so the same code
//! runs against `SQLite`, in-memory stores, or any other backend.
//!
//! # Examples
//!
//! ```
//! use beacon_core::{CandidateProfile, InteractionKind, test_support::MemoryStore};
//! use beacon_scorer::{
//!     CandidateRanker, InteractionRecorder, PreferenceLearner, RecommendationQuery,
//!     RecordInteraction,
//! };
//!
//! let store = MemoryStore::with_profiles([
//!     CandidateProfile::new("ada").with_tags(["music"]),
//!     CandidateProfile::new("grace").with_tags(["music", "chess"]),
//! ]);
//! InteractionRecorder::new(&store).record("ada", RecordInteraction {
//!     target_id: "grace".into(),
//!     kind: InteractionKind::Meet,
//!     ..RecordInteraction::default()
//! })?;
//! PreferenceLearner::new(&store, &store, &store).learn("ada")?;
//!
//! let page = CandidateRanker::new(&store, &store).recommend("ada", &RecommendationQuery::default())?;
//! assert!(page.ml_enabled);
//! assert_eq!(page.recommendations.len(), 1);
//! # Ok::<(), beacon_scorer::EngineError>(())
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod attributes;
mod error;
pub mod learner;
mod ml;
pub mod proximity;
mod ranker;
mod recorder;
mod types;

pub use attributes::{activity_score, compatibility_score, completeness_score, interest_score};
pub use error::EngineError;
pub use learner::{PreferenceLearner, build_model, decayed_weight};
pub use ml::{MAX_ML_SCORE, MlScorer, ml_score};
pub use proximity::{EARTH_RADIUS_KM, MAX_DISTANCE_KM, distance_km, distance_score, haversine_km};
pub use ranker::{CandidateRanker, rank, score_candidate};
pub use recorder::InteractionRecorder;
pub use types::{
    BatchSummary, ComponentScores, LearnOutcome, LearnerConfig, ProfileSummary, RankerConfig,
    RecordInteraction, Recommendation, RecommendationPage, RecommendationQuery, ScoreBreakdown,
};
