//! Attribute scorers: interest overlap, recency, completeness, and explicit
//! compatibility rules.
//!
//! Every function is total over its inputs. Missing data maps onto a fixed
//! neutral score instead of an error.

use std::collections::BTreeSet;

use beacon_core::CandidateProfile;
use chrono::{DateTime, Utc};

/// Interest score used when either side declared no interests.
pub const NEUTRAL_INTEREST_SCORE: u32 = 12;
/// Interest score for a full match.
pub const MAX_INTEREST_SCORE: u32 = 25;
/// Activity score used when the last activity is unknown.
pub const UNKNOWN_ACTIVITY_SCORE: u32 = 5;
/// Ceiling on the completeness score.
pub const MAX_COMPLETENESS_SCORE: u32 = 10;
/// Starting point of the compatibility score.
pub const BASE_COMPATIBILITY_SCORE: i64 = 10;
/// Ceiling on the compatibility score.
pub const MAX_COMPATIBILITY_SCORE: i64 = 20;

const ESSENTIAL_BONUS: i64 = 3;
const DEALBREAKER_PENALTY: i64 = 10;
const BIO_MIN_CHARS: usize = 20;

/// Minutes since last activity (exclusive upper edge) with their scores.
const ACTIVITY_BUCKETS: [(i64, u32); 6] = [
    (5, 15),
    (15, 14),
    (60, 12),
    (360, 10),
    (1_440, 7),
    (10_080, 4),
];
const STALE_ACTIVITY_SCORE: u32 = 2;

/// Score interest overlap in `0..=25`, normalised by the viewer's interests.
///
/// The ratio is taken against the viewer's set, not the union, so a viewer
/// with few interests is easier to match fully.
///
/// # Examples
/// ```
/// use std::collections::BTreeSet;
/// use beacon_scorer::interest_score;
///
/// let viewer: BTreeSet<String> = ["music", "fitness"].map(String::from).into();
/// let candidate: BTreeSet<String> = ["music", "art"].map(String::from).into();
/// assert_eq!(interest_score(&viewer, &candidate), 13);
/// assert_eq!(interest_score(&BTreeSet::new(), &candidate), 12);
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "overlap ratio is scaled and rounded into a small non-negative integer"
)]
pub fn interest_score(viewer_tags: &BTreeSet<String>, candidate_tags: &BTreeSet<String>) -> u32 {
    if viewer_tags.is_empty() || candidate_tags.is_empty() {
        return NEUTRAL_INTEREST_SCORE;
    }
    let shared = viewer_tags.intersection(candidate_tags).count();
    let ratio = shared as f64 / viewer_tags.len() as f64;
    (ratio * f64::from(MAX_INTEREST_SCORE)).round() as u32
}

/// Score how recently the candidate was active, in `2..=15`.
///
/// A `last_seen` in the future counts as active just now.
#[must_use]
pub fn activity_score(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    let Some(seen) = last_seen else {
        return UNKNOWN_ACTIVITY_SCORE;
    };
    let minutes = (now - seen).num_minutes();
    ACTIVITY_BUCKETS
        .iter()
        .find(|(edge, _)| minutes < *edge)
        .map_or(STALE_ACTIVITY_SCORE, |(_, score)| *score)
}

/// Score profile completeness additively, capped at 10.
#[must_use]
pub fn completeness_score(profile: &CandidateProfile) -> u32 {
    let photo_count = profile.photos.len();
    let checks = [
        (photo_count > 0, 3),
        (photo_count > 2, 1),
        (profile.bio.chars().count() > BIO_MIN_CHARS, 2),
        (!profile.tags.is_empty(), 1),
        (!profile.looking_for.is_empty(), 1),
        (
            profile
                .city
                .as_deref()
                .is_some_and(|city| !city.trim().is_empty()),
            1,
        ),
        (profile.is_verified(), 1),
    ];
    let total: u32 = checks
        .iter()
        .filter(|(passed, _)| *passed)
        .map(|(_, points)| points)
        .sum();
    total.min(MAX_COMPLETENESS_SCORE)
}

/// Score the viewer's essentials and dealbreakers against a candidate.
///
/// Starts at 10, adds 3 per essential found in the candidate's tags or
/// `looking_for`, subtracts 10 per dealbreaker found in the candidate's
/// tags, then clamps to `0..=20`. Penalties stack before the clamp, so one
/// dealbreaker can cancel several essentials.
#[must_use]
pub fn compatibility_score(viewer: &CandidateProfile, candidate: &CandidateProfile) -> u32 {
    let essentials = viewer
        .essentials
        .iter()
        .filter(|e| candidate.tags.contains(*e) || candidate.looking_for.contains(*e))
        .count();
    let dealbreakers = viewer
        .dealbreakers
        .iter()
        .filter(|d| candidate.tags.contains(*d))
        .count();

    let bonus = ESSENTIAL_BONUS.saturating_mul(i64::try_from(essentials).unwrap_or(i64::MAX));
    let penalty =
        DEALBREAKER_PENALTY.saturating_mul(i64::try_from(dealbreakers).unwrap_or(i64::MAX));
    let raw = BASE_COMPATIBILITY_SCORE
        .saturating_add(bonus)
        .saturating_sub(penalty);
    u32::try_from(raw.clamp(0, MAX_COMPATIBILITY_SCORE)).unwrap_or(0)
}
