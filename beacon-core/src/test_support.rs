//! Test-only, in-memory store implementations used by unit and behaviour
//! tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use crate::{
    CandidateProfile, InteractionEvent, InteractionStore, LearnedPreferenceModel, NewInteraction,
    PreferenceStore, ProfileStore, StoreError,
};

/// In-memory implementation of every storage trait.
///
/// Profiles are returned in insertion order. Interactions are kept in an
/// append-only vector and read back newest first.
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: Vec<CandidateProfile>,
    blocks: BTreeMap<String, BTreeSet<String>>,
    interactions: Mutex<Vec<InteractionEvent>>,
    models: Mutex<BTreeMap<String, LearnedPreferenceModel>>,
}

impl MemoryStore {
    /// Create a store from a collection of profiles.
    pub fn with_profiles<I>(profiles: I) -> Self
    where
        I: IntoIterator<Item = CandidateProfile>,
    {
        Self {
            profiles: profiles.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Add a profile.
    pub fn insert_profile(&mut self, profile: CandidateProfile) {
        self.profiles.push(profile);
    }

    /// Record that `user_id` blocked `blocked_id`.
    pub fn block(&mut self, user_id: &str, blocked_id: &str) {
        self.blocks
            .entry(user_id.to_owned())
            .or_default()
            .insert(blocked_id.to_owned());
    }

    /// Return a snapshot of every stored interaction in insertion order.
    ///
    /// # Errors
    /// Returns [`StoreError::Corrupt`] when the interaction lock is poisoned.
    pub fn interactions(&self) -> Result<Vec<InteractionEvent>, StoreError> {
        Ok(lock(&self.interactions, "snapshot interactions")?.clone())
    }
}

fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    operation: &'static str,
) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::Corrupt {
        operation,
        reason: "lock poisoned".to_owned(),
    })
}

impl ProfileStore for MemoryStore {
    fn profile(&self, id: &str) -> Result<Option<CandidateProfile>, StoreError> {
        Ok(self.profiles.iter().find(|p| p.id == id).cloned())
    }

    fn visible_profiles(&self) -> Result<Vec<CandidateProfile>, StoreError> {
        Ok(self.profiles.clone())
    }

    fn profiles_by_ids(&self, ids: &[String]) -> Result<Vec<CandidateProfile>, StoreError> {
        Ok(self
            .profiles
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    fn blocked_ids(&self, id: &str) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.blocks.get(id).cloned().unwrap_or_default())
    }
}

impl InteractionStore for MemoryStore {
    fn append_interaction(
        &self,
        interaction: NewInteraction,
    ) -> Result<InteractionEvent, StoreError> {
        let mut events = lock(&self.interactions, "append interaction")?;
        let id = u64::try_from(events.len()).map_or(u64::MAX, |n| n + 1);
        let event = InteractionEvent::from_new(id, interaction);
        events.push(event.clone());
        Ok(event)
    }

    fn recent_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionEvent>, StoreError> {
        let events = lock(&self.interactions, "read interactions")?;
        let mut mine: Vec<_> = events
            .iter()
            .filter(|event| event.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        mine.truncate(limit);
        Ok(mine)
    }

    fn interacting_users(&self) -> Result<Vec<String>, StoreError> {
        let events = lock(&self.interactions, "list interacting users")?;
        let users: BTreeSet<String> = events.iter().map(|e| e.user_id.clone()).collect();
        Ok(users.into_iter().collect())
    }
}

impl PreferenceStore for MemoryStore {
    fn preferences(&self, user_id: &str) -> Result<Option<LearnedPreferenceModel>, StoreError> {
        Ok(lock(&self.models, "read preferences")?.get(user_id).cloned())
    }

    fn save_preferences(&self, model: &LearnedPreferenceModel) -> Result<(), StoreError> {
        lock(&self.models, "save preferences")?.insert(model.user_id.clone(), model.clone());
        Ok(())
    }
}

/// Store whose every call fails, for exercising error propagation.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

fn unavailable(operation: &'static str) -> StoreError {
    StoreError::backend(operation, std::io::Error::other("store unavailable"))
}

impl ProfileStore for FailingStore {
    fn profile(&self, _id: &str) -> Result<Option<CandidateProfile>, StoreError> {
        Err(unavailable("read profile"))
    }

    fn visible_profiles(&self) -> Result<Vec<CandidateProfile>, StoreError> {
        Err(unavailable("read visible profiles"))
    }

    fn profiles_by_ids(&self, _ids: &[String]) -> Result<Vec<CandidateProfile>, StoreError> {
        Err(unavailable("read profiles by id"))
    }

    fn blocked_ids(&self, _id: &str) -> Result<BTreeSet<String>, StoreError> {
        Err(unavailable("read block list"))
    }
}

impl InteractionStore for FailingStore {
    fn append_interaction(
        &self,
        _interaction: NewInteraction,
    ) -> Result<InteractionEvent, StoreError> {
        Err(unavailable("append interaction"))
    }

    fn recent_interactions(
        &self,
        _user_id: &str,
        _limit: usize,
    ) -> Result<Vec<InteractionEvent>, StoreError> {
        Err(unavailable("read interactions"))
    }

    fn interacting_users(&self) -> Result<Vec<String>, StoreError> {
        Err(unavailable("list interacting users"))
    }
}

impl PreferenceStore for FailingStore {
    fn preferences(&self, _user_id: &str) -> Result<Option<LearnedPreferenceModel>, StoreError> {
        Err(unavailable("read preferences"))
    }

    fn save_preferences(&self, _model: &LearnedPreferenceModel) -> Result<(), StoreError> {
        Err(unavailable("save preferences"))
    }
}
