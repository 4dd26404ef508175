//! Core domain types for the Beacon recommendation engine.
//!
//! The crate defines the profiles the scorers read, the interaction events
//! the learner consumes, the learned preference model that links the two
//! pipelines, and the storage traits through which all of them are fetched
//! and persisted.
//!
//! # Examples
//!
//! ```
//! use beacon_core::{CandidateProfile, InteractionKind, age_bucket};
//!
//! let profile = CandidateProfile::new("ada@example.com").with_tags(["music"]);
//! assert_eq!(profile.tags.len(), 1);
//! assert_eq!(InteractionKind::Meet.weight(), 2.0);
//! assert_eq!(age_bucket(42), 40);
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod interaction;
pub mod preferences;
pub mod profile;
pub mod store;

/// In-memory stores for tests.
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use interaction::{InteractionEvent, InteractionKind, NewInteraction};
pub use preferences::{AGE_BUCKET_YEARS, AgeRange, LearnedPreferenceModel, age_bucket};
pub use profile::CandidateProfile;
pub use store::{BoxedSource, InteractionStore, PreferenceStore, ProfileStore, StoreError};
