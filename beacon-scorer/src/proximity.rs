//! Great-circle distance and bucketed proximity scoring.
//!
//! Buckets are deliberately coarse: noisy GPS fixes should not reorder two
//! candidates that are effectively the same distance away.

use geo::Coord;

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Longest surface distance worth recording: half the equatorial
/// circumference, in kilometres.
pub const MAX_DISTANCE_KM: f64 = 20_038.0;

/// Score awarded when either endpoint has no usable location.
pub const UNKNOWN_DISTANCE_SCORE: u32 = 10;

/// Upper bucket edges (exclusive) in kilometres with their scores.
const DISTANCE_BUCKETS: [(f64, u32); 7] = [
    (1.0, 30),
    (3.0, 27),
    (5.0, 25),
    (10.0, 22),
    (25.0, 18),
    (50.0, 14),
    (100.0, 10),
];

/// Score for anything at or beyond the last bucket edge.
const FAR_SCORE: u32 = 5;

/// Haversine distance in kilometres between two latitude/longitude pairs.
///
/// Returns `None` when any coordinate is not finite; callers must treat that
/// as an unknown distance rather than zero.
///
/// # Examples
/// ```
/// use beacon_scorer::haversine_km;
///
/// let km = haversine_km(51.5, -0.1, 51.5, -0.1).unwrap_or(f64::NAN);
/// assert_eq!(km, 0.0);
/// assert!(haversine_km(f64::NAN, 0.0, 0.0, 0.0).is_none());
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "the haversine formula is floating-point trigonometry"
)]
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> Option<f64> {
    if ![lat1, lng1, lat2, lng2].iter().all(|v| v.is_finite()) {
        return None;
    }
    // Canonical endpoint order keeps the result bit-identical in both directions.
    let ((lat_a, lng_a), (lat_b, lng_b)) = if (lat1, lng1) <= (lat2, lng2) {
        ((lat1, lng1), (lat2, lng2))
    } else {
        ((lat2, lng2), (lat1, lng1))
    };

    let d_lat = (lat_b - lat_a).to_radians();
    let d_lng = (lng_b - lng_a).to_radians();
    let half_chord = (d_lat / 2.0).sin().powi(2)
        + lat_a.to_radians().cos() * lat_b.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let angle = 2.0 * half_chord.sqrt().atan2((1.0 - half_chord).max(0.0).sqrt());
    Some(EARTH_RADIUS_KM * angle)
}

/// Distance between two optional positions (`x = longitude`, `y = latitude`).
#[must_use]
pub fn distance_km(from: Option<Coord<f64>>, to: Option<Coord<f64>>) -> Option<f64> {
    let (a, b) = (from?, to?);
    haversine_km(a.y, a.x, b.y, b.x)
}

/// Map a distance onto its proximity bucket score in `5..=30`.
///
/// Bucket edges are inclusive-lower and exclusive-upper. An unknown distance
/// scores [`UNKNOWN_DISTANCE_SCORE`].
///
/// # Examples
/// ```
/// use beacon_scorer::distance_score;
///
/// assert_eq!(distance_score(Some(0.9)), 30);
/// assert_eq!(distance_score(Some(1.0)), 27);
/// assert_eq!(distance_score(Some(250.0)), 5);
/// assert_eq!(distance_score(None), 10);
/// ```
#[must_use]
pub fn distance_score(km: Option<f64>) -> u32 {
    let Some(known) = km.filter(|value| !value.is_nan()) else {
        return UNKNOWN_DISTANCE_SCORE;
    };
    DISTANCE_BUCKETS
        .iter()
        .find(|(edge, _)| known < *edge)
        .map_or(FAR_SCORE, |(_, score)| *score)
}
