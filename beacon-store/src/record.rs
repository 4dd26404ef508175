//! Storage-boundary adapter for profile documents.
//!
//! Profile documents arrive from several producers with overlapping field
//! names (`email` and `id`, `interests` and `tags`, `lastLat` and
//! `last_lat`, `lastSeen` and `updatedAt`). [`ProfileRecord`] accepts all of them and normalises the
//! result into a single [`CandidateProfile`], so the scorers never branch on
//! aliases.

use std::collections::BTreeSet;

use beacon_core::CandidateProfile;
use chrono::{DateTime, Utc};
use geo::Coord;
use serde::{Deserialize, Serialize};

/// A profile document as stored or imported.
///
/// # Examples
/// ```
/// use beacon_store::ProfileRecord;
///
/// let record: ProfileRecord = serde_json::from_str(
///     r#"{"email":"ada@example.com","last_lat":51.5,"last_lng":-0.1,"interests":["music"],"tags":["chess"]}"#,
/// )
/// .expect("valid document");
/// let profile = record.into_profile();
/// assert_eq!(profile.id, "ada@example.com");
/// assert_eq!(profile.tags.len(), 2);
/// assert!(profile.location.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    /// Email address; the preferred identity because interactions refer to
    /// users by email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Fallback identity used when `email` is absent or blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name shown in the feed.
    #[serde(default, alias = "display_name", alias = "name")]
    pub display_name: Option<String>,
    /// Last known latitude.
    #[serde(default, alias = "last_lat")]
    pub last_lat: Option<f64>,
    /// Last known longitude.
    #[serde(default, alias = "last_lng")]
    pub last_lng: Option<f64>,
    /// City name.
    #[serde(default)]
    pub city: Option<String>,
    /// Declared interests.
    #[serde(default)]
    pub interests: Vec<String>,
    /// Free-form tags; merged with `interests`.
    #[serde(default)]
    pub tags: Vec<String>,
    /// What the user is looking for.
    #[serde(default, alias = "looking_for")]
    pub looking_for: Vec<String>,
    /// Last activity.
    #[serde(default, alias = "last_seen")]
    pub last_seen: Option<DateTime<Utc>>,
    /// Last profile update; used when `last_seen` is absent.
    #[serde(default, alias = "updated_at")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Photo references in display order.
    #[serde(default)]
    pub photos: Vec<String>,
    /// Free-text biography.
    #[serde(default)]
    pub bio: Option<String>,
    /// Identity verified.
    #[serde(default)]
    pub verified: bool,
    /// Seller verification.
    #[serde(default, alias = "verified_seller")]
    pub verified_seller: bool,
    /// Organizer verification.
    #[serde(default, alias = "verified_organizer")]
    pub verified_organizer: bool,
    /// Attributes this user requires in others.
    #[serde(default)]
    pub essentials: Vec<String>,
    /// Attributes this user rejects in others.
    #[serde(default)]
    pub dealbreakers: Vec<String>,
    /// Declared profile type.
    #[serde(default, alias = "profile_type")]
    pub profile_type: Option<String>,
    /// Personality archetypes.
    #[serde(default)]
    pub archetypes: Vec<String>,
    /// Age in years.
    #[serde(default)]
    pub age: Option<u32>,
    /// Identities this user has blocked.
    #[serde(default, alias = "blocked_users", alias = "blockedUsers")]
    pub blocked: Vec<String>,
    /// Whether the profile may appear in feeds.
    #[serde(default = "enabled")]
    pub visible: bool,
    /// Whether onboarding was completed.
    #[serde(default = "enabled")]
    pub onboarded: bool,
}

const fn enabled() -> bool {
    true
}

impl ProfileRecord {
    /// The trimmed identity: `email` when present and non-blank, otherwise
    /// `id`. Returns `None` when neither carries a value.
    ///
    /// # Examples
    /// ```
    /// use beacon_store::ProfileRecord;
    ///
    /// let record: ProfileRecord =
    ///     serde_json::from_str(r#"{"id":"u-1","email":" ada@example.com "}"#)
    ///         .expect("valid document");
    /// assert_eq!(record.identity().as_deref(), Some("ada@example.com"));
    /// ```
    #[must_use]
    pub fn identity(&self) -> Option<String> {
        non_blank(self.email.clone()).or_else(|| non_blank(self.id.clone()))
    }

    /// Normalise the record into a scorer-facing profile.
    ///
    /// Strings are trimmed and blanks dropped, `interests` and `tags` are
    /// merged, and a location is kept only when both coordinates are finite.
    /// A record without an identity yields an empty `id`.
    #[must_use]
    pub fn into_profile(self) -> CandidateProfile {
        let id = self.identity().unwrap_or_default();
        let location = match (self.last_lat, self.last_lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Some(Coord { x: lng, y: lat })
            }
            _ => None,
        };
        CandidateProfile {
            id,
            display_name: non_blank(self.display_name),
            location,
            city: non_blank(self.city),
            tags: clean_set(self.interests.into_iter().chain(self.tags)),
            looking_for: clean_set(self.looking_for),
            last_seen: self.last_seen.or(self.updated_at),
            photos: self
                .photos
                .into_iter()
                .filter(|photo| !photo.trim().is_empty())
                .collect(),
            bio: self.bio.unwrap_or_default(),
            verified: self.verified,
            verified_seller: self.verified_seller,
            verified_organizer: self.verified_organizer,
            essentials: clean_set(self.essentials),
            dealbreakers: clean_set(self.dealbreakers),
            profile_type: non_blank(self.profile_type),
            archetypes: clean_set(self.archetypes),
            age: self.age,
        }
    }

    /// Identities this record blocks, trimmed and de-duplicated.
    #[must_use]
    pub fn blocked_ids(&self) -> BTreeSet<String> {
        clean_set(self.blocked.iter().cloned())
    }
}

impl From<&CandidateProfile> for ProfileRecord {
    fn from(profile: &CandidateProfile) -> Self {
        Self {
            email: None,
            id: Some(profile.id.clone()),
            display_name: profile.display_name.clone(),
            last_lat: profile.latitude(),
            last_lng: profile.longitude(),
            city: profile.city.clone(),
            interests: Vec::new(),
            tags: profile.tags.iter().cloned().collect(),
            looking_for: profile.looking_for.iter().cloned().collect(),
            last_seen: profile.last_seen,
            updated_at: None,
            photos: profile.photos.clone(),
            bio: (!profile.bio.is_empty()).then(|| profile.bio.clone()),
            verified: profile.verified,
            verified_seller: profile.verified_seller,
            verified_organizer: profile.verified_organizer,
            essentials: profile.essentials.iter().cloned().collect(),
            dealbreakers: profile.dealbreakers.iter().cloned().collect(),
            profile_type: profile.profile_type.clone(),
            archetypes: profile.archetypes.iter().cloned().collect(),
            age: profile.age,
            blocked: Vec::new(),
            visible: true,
            onboarded: true,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

fn clean_set<I>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = String>,
{
    values
        .into_iter()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"id":"a","lastLat":1.0,"lastLng":2.0}"#)]
    #[case(r#"{"id":"a","last_lat":1.0,"last_lng":2.0}"#)]
    fn accepts_both_location_spellings(#[case] json: &str) {
        let record: ProfileRecord = serde_json::from_str(json).expect("valid record");
        assert_eq!(
            record.into_profile().location,
            Some(Coord { x: 2.0, y: 1.0 })
        );
    }

    #[rstest]
    fn half_a_location_is_no_location() {
        let record: ProfileRecord =
            serde_json::from_str(r#"{"id":"a","lastLat":1.0}"#).expect("valid record");
        assert!(record.into_profile().location.is_none());
    }

    #[rstest]
    fn merges_interests_and_tags_and_trims() {
        let record: ProfileRecord = serde_json::from_str(
            r#"{"id":" a ","interests":["music "," "],"tags":["music","chess"],"profileType":"  "}"#,
        )
        .expect("valid record");
        let profile = record.into_profile();
        assert_eq!(profile.id, "a");
        assert_eq!(
            profile.tags.into_iter().collect::<Vec<_>>(),
            ["chess", "music"]
        );
        assert!(profile.profile_type.is_none());
    }

    #[rstest]
    fn last_seen_falls_back_to_updated_at() {
        let record: ProfileRecord =
            serde_json::from_str(r#"{"id":"a","updatedAt":"2026-01-02T03:04:05Z"}"#)
                .expect("valid record");
        assert!(record.visible && record.onboarded);
        assert!(record.into_profile().last_seen.is_some());
    }

    #[rstest]
    #[case(r#"{"id":"u-1","email":"ada@example.com"}"#, "ada@example.com")]
    #[case(r#"{"email":"ada@example.com","id":"u-1"}"#, "ada@example.com")]
    #[case(r#"{"id":"u-1","email":"  "}"#, "u-1")]
    #[case(r#"{"id":"u-1"}"#, "u-1")]
    fn identity_prefers_email_over_id(#[case] json: &str, #[case] expected: &str) {
        let record: ProfileRecord = serde_json::from_str(json).expect("valid record");
        assert_eq!(record.into_profile().id, expected);
    }

    #[rstest]
    fn missing_identity_yields_an_empty_id() {
        let record: ProfileRecord =
            serde_json::from_str(r#"{"id":" ","displayName":"Ada"}"#).expect("valid record");
        assert!(record.identity().is_none());
        assert!(record.into_profile().id.is_empty());
    }

    #[rstest]
    fn round_trips_through_candidate_profile() {
        let profile = CandidateProfile {
            bio: "hello".into(),
            age: Some(40),
            ..CandidateProfile::new("a")
                .with_location(51.5, -0.1)
                .with_tags(["music"])
        };
        assert_eq!(ProfileRecord::from(&profile).into_profile(), profile);
    }
}
