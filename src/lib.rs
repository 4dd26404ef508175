//! Facade crate for the Beacon discovery engine.
//!
//! This crate re-exports the domain types, storage traits, and scoring
//! pipelines, and exposes the `SQLite` store behind a feature flag.

#![forbid(unsafe_code)]

pub use beacon_core::{
    AgeRange, CandidateProfile, InteractionEvent, InteractionKind, InteractionStore,
    LearnedPreferenceModel, NewInteraction, PreferenceStore, ProfileStore, StoreError,
};

pub use beacon_scorer::{
    BatchSummary, CandidateRanker, ComponentScores, EngineError, InteractionRecorder,
    LearnOutcome, LearnerConfig, PreferenceLearner, ProfileSummary, RankerConfig, RecordInteraction,
    Recommendation, RecommendationPage, RecommendationQuery, ScoreBreakdown,
};

#[cfg(feature = "store-sqlite")]
pub use beacon_store::{ProfileRecord, SqliteStore, SqliteStoreError};
