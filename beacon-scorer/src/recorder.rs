//! Appends interaction events on behalf of an authenticated actor.

use beacon_core::{InteractionEvent, InteractionKind, InteractionStore, NewInteraction};
use chrono::{DateTime, Utc};
use log::debug;

use crate::error::{EngineError, authenticated};
use crate::proximity::MAX_DISTANCE_KM;
use crate::types::{RecordInteraction, location_override};

/// Records user actions into the interaction log.
///
/// Each call performs one append and nothing else, so concurrent recordings
/// from the same actor never conflict. Kinds outside the weight table are
/// stored verbatim; only the learner treats them as zero weight.
///
/// # Examples
/// ```
/// use beacon_core::{InteractionKind, test_support::MemoryStore};
/// use beacon_scorer::{InteractionRecorder, RecordInteraction};
///
/// let store = MemoryStore::default();
/// let recorder = InteractionRecorder::new(&store);
/// let event = recorder.record("ada", RecordInteraction {
///     target_id: "grace".into(),
///     kind: InteractionKind::Like,
///     ..RecordInteraction::default()
/// })?;
/// assert_eq!(event.user_id, "ada");
/// # Ok::<(), beacon_scorer::EngineError>(())
/// ```
#[derive(Debug)]
pub struct InteractionRecorder<I> {
    store: I,
}

impl<I: InteractionStore> InteractionRecorder<I> {
    /// Build a recorder over an interaction store.
    pub const fn new(store: I) -> Self {
        Self { store }
    }

    /// Record an interaction timestamped now.
    ///
    /// # Errors
    /// See [`InteractionRecorder::record_at`].
    pub fn record(
        &self,
        actor: &str,
        request: RecordInteraction,
    ) -> Result<InteractionEvent, EngineError> {
        self.record_at(actor, request, Utc::now())
    }

    /// Record an interaction with an explicit timestamp.
    ///
    /// # Errors
    /// - [`EngineError::Authentication`] when `actor` is blank.
    /// - [`EngineError::Validation`] when the target or type is blank, or the
    ///   distance or location is not usable.
    /// - [`EngineError::Storage`] when the append fails.
    pub fn record_at(
        &self,
        actor: &str,
        request: RecordInteraction,
        now: DateTime<Utc>,
    ) -> Result<InteractionEvent, EngineError> {
        let user_id = authenticated(actor)?.to_owned();
        let interaction = validate(user_id, request, now)?;
        let event = self.store.append_interaction(interaction)?;
        debug!(
            "recorded {} interaction {} from {} to {}",
            event.kind, event.id, event.user_id, event.target_id
        );
        Ok(event)
    }
}

fn validate(
    user_id: String,
    request: RecordInteraction,
    now: DateTime<Utc>,
) -> Result<NewInteraction, EngineError> {
    let target_id = request.target_id.trim();
    if target_id.is_empty() {
        return Err(EngineError::validation("target", "must not be empty"));
    }
    if is_blank(&request.kind) {
        return Err(EngineError::validation("type", "must not be empty"));
    }
    if let Some(km) = request.distance_km
        && !(0.0..=MAX_DISTANCE_KM).contains(&km)
    {
        return Err(EngineError::validation(
            "distanceKm",
            "must be between 0 and 20038",
        ));
    }
    let location = location_override(request.lat, request.lng)?;

    Ok(NewInteraction {
        user_id,
        target_id: target_id.to_owned(),
        kind: request.kind,
        created_at: now,
        distance_km: request.distance_km,
        location,
        duration_seconds: request.duration_seconds,
        metadata: request.metadata,
    })
}

fn is_blank(kind: &InteractionKind) -> bool {
    matches!(kind, InteractionKind::Other(raw) if raw.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::test_support::{FailingStore, MemoryStore};
    use geo::Coord;
    use rstest::rstest;
    use serde_json::json;

    fn like(target: &str) -> RecordInteraction {
        RecordInteraction {
            target_id: target.to_owned(),
            kind: InteractionKind::Like,
            ..RecordInteraction::default()
        }
    }

    #[rstest]
    fn stores_every_optional_field() {
        let store = MemoryStore::default();
        let recorder = InteractionRecorder::new(&store);
        let request = RecordInteraction {
            distance_km: Some(2.5),
            lat: Some(51.5),
            lng: Some(-0.1),
            duration_seconds: Some(40),
            metadata: json!({"source": "feed"}),
            ..like("grace")
        };
        let event = recorder
            .record_at("ada", request, DateTime::<Utc>::UNIX_EPOCH)
            .expect("record");
        assert_eq!(event.id, 1);
        assert_eq!(event.location, Some(Coord { x: -0.1, y: 51.5 }));
        assert_eq!(event.duration_seconds, Some(40));
        assert_eq!(event.metadata["source"], "feed");
        assert_eq!(store.interactions().expect("snapshot").len(), 1);
    }

    #[rstest]
    fn unknown_kinds_are_stored_verbatim() {
        let store = MemoryStore::default();
        let recorder = InteractionRecorder::new(&store);
        let request = RecordInteraction {
            kind: InteractionKind::from("wave"),
            ..like("grace")
        };
        let event = recorder.record("ada", request).expect("record");
        assert_eq!(event.kind.as_str(), "wave");
    }

    #[rstest]
    #[case(RecordInteraction { target_id: " ".into(), ..like("x") }, "target")]
    #[case(RecordInteraction { kind: InteractionKind::from(""), ..like("x") }, "type")]
    #[case(RecordInteraction { distance_km: Some(-1.0), ..like("x") }, "distanceKm")]
    #[case(RecordInteraction { distance_km: Some(f64::NAN), ..like("x") }, "distanceKm")]
    #[case(RecordInteraction { distance_km: Some(f64::INFINITY), ..like("x") }, "distanceKm")]
    #[case(RecordInteraction { distance_km: Some(f64::MAX), ..like("x") }, "distanceKm")]
    #[case(RecordInteraction { lat: Some(1.0), ..like("x") }, "lng")]
    fn invalid_requests_name_the_field(#[case] request: RecordInteraction, #[case] field: &str) {
        let store = MemoryStore::default();
        let err = InteractionRecorder::new(&store)
            .record("ada", request)
            .expect_err("invalid request");
        assert!(
            matches!(err, EngineError::Validation { field: f, .. } if f == field),
            "unexpected error: {err:?}"
        );
        assert!(store.interactions().expect("snapshot").is_empty());
    }

    #[rstest]
    fn blank_actor_is_rejected() {
        let store = MemoryStore::default();
        let err = InteractionRecorder::new(&store)
            .record("", like("grace"))
            .expect_err("no actor");
        assert!(matches!(err, EngineError::Authentication));
    }

    #[rstest]
    fn storage_failures_propagate() {
        let err = InteractionRecorder::new(FailingStore)
            .record("ada", like("grace"))
            .expect_err("failing store");
        assert!(matches!(err, EngineError::Storage(_)));
    }
}
