//! Candidate profiles: the normalised view of a user that the scorers read.
//!
//! Storage adapters are responsible for folding aliased or optional fields
//! into this single shape, so scoring code never branches on field names.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use geo::Coord;

/// A profile being evaluated for a viewer, or the viewer themselves.
///
/// Locations use WGS84 with `x = longitude` and `y = latitude`. The
/// `essentials` and `dealbreakers` sets are only consulted when the profile
/// acts as the viewer.
///
/// # Examples
/// ```
/// use beacon_core::CandidateProfile;
///
/// let profile = CandidateProfile::new("ada@example.com")
///     .with_location(51.5, -0.1)
///     .with_tags(["music", "fitness"]);
/// assert_eq!(profile.id, "ada@example.com");
/// assert!(profile.tags.contains("music"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CandidateProfile {
    /// Unique identity (an email address or opaque id).
    pub id: String,
    /// Name shown to other users.
    pub display_name: Option<String>,
    /// Last known position.
    pub location: Option<Coord<f64>>,
    /// Home city, if declared.
    pub city: Option<String>,
    /// Interests and tags, merged.
    pub tags: BTreeSet<String>,
    /// What the user is looking for.
    pub looking_for: BTreeSet<String>,
    /// Last activity timestamp.
    pub last_seen: Option<DateTime<Utc>>,
    /// Photo references in display order.
    pub photos: Vec<String>,
    /// Free-form biography.
    pub bio: String,
    /// Identity verification flag.
    pub verified: bool,
    /// Seller verification flag.
    pub verified_seller: bool,
    /// Organiser verification flag.
    pub verified_organizer: bool,
    /// Attributes the user requires in a match.
    pub essentials: BTreeSet<String>,
    /// Attributes the user refuses in a match.
    pub dealbreakers: BTreeSet<String>,
    /// Coarse profile category, e.g. `"personal"` or `"organizer"`.
    pub profile_type: Option<String>,
    /// Personality archetypes.
    pub archetypes: BTreeSet<String>,
    /// Age in years.
    pub age: Option<u32>,
}

impl CandidateProfile {
    /// Construct an otherwise empty profile with the given identity.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set the location from latitude and longitude in degrees.
    #[must_use]
    pub fn with_location(mut self, lat: f64, lng: f64) -> Self {
        self.location = Some(Coord { x: lng, y: lat });
        self
    }

    /// Replace the tag set.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the essentials set.
    #[must_use]
    pub fn with_essentials<I, S>(mut self, essentials: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.essentials = essentials.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the dealbreakers set.
    #[must_use]
    pub fn with_dealbreakers<I, S>(mut self, dealbreakers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dealbreakers = dealbreakers.into_iter().map(Into::into).collect();
        self
    }

    /// Latitude in degrees, when a location is known.
    #[must_use]
    pub fn latitude(&self) -> Option<f64> {
        self.location.map(|coord| coord.y)
    }

    /// Longitude in degrees, when a location is known.
    #[must_use]
    pub fn longitude(&self) -> Option<f64> {
        self.location.map(|coord| coord.x)
    }

    /// Report whether any verification flag is set.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.verified || self.verified_seller || self.verified_organizer
    }
}
