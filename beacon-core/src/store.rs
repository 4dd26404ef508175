//! Data access traits for profiles, interactions, and preference models.
//!
//! The ranking and learning pipelines receive these collaborators through
//! their constructors. Implementations must be `Send + Sync` so one store can
//! serve concurrent requests; they perform no retries of their own.

use std::collections::BTreeSet;
use std::error::Error as StdError;

use thiserror::Error;

use crate::{CandidateProfile, InteractionEvent, LearnedPreferenceModel, NewInteraction};

/// Boxed source error carried across the storage seam.
pub type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Error raised by any storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed to read or write.
    #[error("storage backend failed to {operation}")]
    Backend {
        /// Description of the failed operation.
        operation: &'static str,
        /// Backend error.
        #[source]
        source: BoxedSource,
    },
    /// Stored data could not be decoded.
    #[error("stored data is corrupt while trying to {operation}: {reason}")]
    Corrupt {
        /// Description of the failed operation.
        operation: &'static str,
        /// What was wrong with the data.
        reason: String,
    },
}

impl StoreError {
    /// Wrap a backend error with the operation that raised it.
    pub fn backend<E>(operation: &'static str, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Backend {
            operation,
            source: Box::new(source),
        }
    }
}

/// Read access to user profiles.
///
/// # Examples
///
/// ```rust
/// use std::collections::BTreeSet;
/// use beacon_core::{CandidateProfile, ProfileStore, StoreError};
///
/// struct OneProfile(CandidateProfile);
///
/// impl ProfileStore for OneProfile {
///     fn profile(&self, id: &str) -> Result<Option<CandidateProfile>, StoreError> {
///         Ok((self.0.id == id).then(|| self.0.clone()))
///     }
///     fn visible_profiles(&self) -> Result<Vec<CandidateProfile>, StoreError> {
///         Ok(vec![self.0.clone()])
///     }
///     fn profiles_by_ids(&self, ids: &[String]) -> Result<Vec<CandidateProfile>, StoreError> {
///         Ok(ids.iter().filter(|id| **id == self.0.id).map(|_| self.0.clone()).collect())
///     }
///     fn blocked_ids(&self, _id: &str) -> Result<BTreeSet<String>, StoreError> {
///         Ok(BTreeSet::new())
///     }
/// }
///
/// let store = OneProfile(CandidateProfile::new("ada"));
/// assert!(store.profile("ada").unwrap_or_default().is_some());
/// ```
pub trait ProfileStore: Send + Sync {
    /// Fetch one profile by identity.
    fn profile(&self, id: &str) -> Result<Option<CandidateProfile>, StoreError>;

    /// Fetch every visible, onboarded profile in a stable order.
    fn visible_profiles(&self) -> Result<Vec<CandidateProfile>, StoreError>;

    /// Fetch the profiles matching `ids`. Unknown identities are omitted.
    fn profiles_by_ids(&self, ids: &[String]) -> Result<Vec<CandidateProfile>, StoreError>;

    /// Return the identities `id` has blocked.
    fn blocked_ids(&self, id: &str) -> Result<BTreeSet<String>, StoreError>;
}

/// Append-only interaction log.
pub trait InteractionStore: Send + Sync {
    /// Append one interaction and return it with its assigned identifier.
    fn append_interaction(
        &self,
        interaction: NewInteraction,
    ) -> Result<InteractionEvent, StoreError>;

    /// Return up to `limit` of the user's interactions, newest first.
    fn recent_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionEvent>, StoreError>;

    /// Return every user that has recorded at least one interaction.
    fn interacting_users(&self) -> Result<Vec<String>, StoreError>;
}

/// Storage for learned preference models, one per user.
pub trait PreferenceStore: Send + Sync {
    /// Fetch the user's model, if one was learned.
    fn preferences(&self, user_id: &str) -> Result<Option<LearnedPreferenceModel>, StoreError>;

    /// Insert or fully replace the user's model.
    fn save_preferences(&self, model: &LearnedPreferenceModel) -> Result<(), StoreError>;
}

impl<T: ProfileStore + ?Sized> ProfileStore for &T {
    fn profile(&self, id: &str) -> Result<Option<CandidateProfile>, StoreError> {
        (**self).profile(id)
    }

    fn visible_profiles(&self) -> Result<Vec<CandidateProfile>, StoreError> {
        (**self).visible_profiles()
    }

    fn profiles_by_ids(&self, ids: &[String]) -> Result<Vec<CandidateProfile>, StoreError> {
        (**self).profiles_by_ids(ids)
    }

    fn blocked_ids(&self, id: &str) -> Result<BTreeSet<String>, StoreError> {
        (**self).blocked_ids(id)
    }
}

impl<T: InteractionStore + ?Sized> InteractionStore for &T {
    fn append_interaction(
        &self,
        interaction: NewInteraction,
    ) -> Result<InteractionEvent, StoreError> {
        (**self).append_interaction(interaction)
    }

    fn recent_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionEvent>, StoreError> {
        (**self).recent_interactions(user_id, limit)
    }

    fn interacting_users(&self) -> Result<Vec<String>, StoreError> {
        (**self).interacting_users()
    }
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for &T {
    fn preferences(&self, user_id: &str) -> Result<Option<LearnedPreferenceModel>, StoreError> {
        (**self).preferences(user_id)
    }

    fn save_preferences(&self, model: &LearnedPreferenceModel) -> Result<(), StoreError> {
        (**self).save_preferences(model)
    }
}
