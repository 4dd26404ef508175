//! Interaction events recorded from user actions.
//!
//! Events are append-only. The learning pipeline reads them back in bulk and
//! weighs each one by its [`InteractionKind`].
//!
//! # Examples
//! ```
//! use beacon_core::InteractionKind;
//!
//! let kind: InteractionKind = "like".parse().unwrap_or_default();
//! assert_eq!(kind, InteractionKind::Like);
//! assert_eq!(kind.weight(), 1.0);
//! assert_eq!(InteractionKind::from("wink").weight(), 0.0);
//! ```

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use geo::Coord;
use serde::{Deserialize, Serialize};

/// The kind of action a user took against another profile.
///
/// Unknown kinds are preserved verbatim in [`InteractionKind::Other`] so the
/// recorder stores whatever the caller sent; they carry no learning weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InteractionKind {
    /// The profile was opened.
    #[default]
    View,
    /// The profile was liked.
    Like,
    /// A message was sent.
    Message,
    /// The users met in person.
    Meet,
    /// The profile was bookmarked.
    Save,
    /// The profile was passed over.
    Skip,
    /// The profile was blocked.
    Block,
    /// Any other kind, stored as sent.
    Other(String),
}

impl InteractionKind {
    /// Return the kind as a lowercase `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::View => "view",
            Self::Like => "like",
            Self::Message => "message",
            Self::Meet => "meet",
            Self::Save => "save",
            Self::Skip => "skip",
            Self::Block => "block",
            Self::Other(raw) => raw.as_str(),
        }
    }

    /// Learning weight applied to one interaction of this kind.
    ///
    /// Positive kinds pull preferences towards the target's attributes,
    /// negative kinds push them away. [`InteractionKind::Other`] weighs zero.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        match self {
            Self::View => 0.1,
            Self::Like => 1.0,
            Self::Message => 1.5,
            Self::Meet => 2.0,
            Self::Save => 0.8,
            Self::Skip => -0.3,
            Self::Block => -2.0,
            Self::Other(_) => 0.0,
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<&str> for InteractionKind {
    fn from(value: &str) -> Self {
        match value {
            "view" => Self::View,
            "like" => Self::Like,
            "message" => Self::Message,
            "meet" => Self::Meet,
            "save" => Self::Save,
            "skip" => Self::Skip,
            "block" => Self::Block,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for InteractionKind {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<InteractionKind> for String {
    fn from(kind: InteractionKind) -> Self {
        match kind {
            InteractionKind::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

/// An interaction about to be appended.
///
/// The actor is filled in from the authenticated caller by the recorder,
/// never from client input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInteraction {
    /// Identity of the acting user.
    pub user_id: String,
    /// Identity of the profile acted upon.
    pub target_id: String,
    /// What happened.
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    /// When it happened.
    pub created_at: DateTime<Utc>,
    /// Distance between the two users at the time, in kilometres.
    pub distance_km: Option<f64>,
    /// Actor position at the time (`x = longitude`, `y = latitude`).
    pub location: Option<Coord<f64>>,
    /// How long the interaction lasted.
    pub duration_seconds: Option<u32>,
    /// Free-form caller metadata.
    pub metadata: serde_json::Value,
}

/// A persisted interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    /// Store-assigned identifier, increasing in insertion order.
    pub id: u64,
    /// Identity of the acting user.
    pub user_id: String,
    /// Identity of the profile acted upon.
    pub target_id: String,
    /// What happened.
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    /// When it happened.
    pub created_at: DateTime<Utc>,
    /// Distance between the two users at the time, in kilometres.
    pub distance_km: Option<f64>,
    /// Actor position at the time (`x = longitude`, `y = latitude`).
    pub location: Option<Coord<f64>>,
    /// How long the interaction lasted.
    pub duration_seconds: Option<u32>,
    /// Free-form caller metadata.
    pub metadata: serde_json::Value,
}

impl InteractionEvent {
    /// Materialise a persisted event from a pending interaction.
    #[must_use]
    pub fn from_new(id: u64, interaction: NewInteraction) -> Self {
        let NewInteraction {
            user_id,
            target_id,
            kind,
            created_at,
            distance_km,
            location,
            duration_seconds,
            metadata,
        } = interaction;
        Self {
            id,
            user_id,
            target_id,
            kind,
            created_at,
            distance_km,
            location,
            duration_seconds,
            metadata,
        }
    }
}
