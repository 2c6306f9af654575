//! Geo-time scoring primitives.
//!
//! Pure functions with no shared state, safe to call concurrently. Both the
//! dedup resolver and the query-side ranker score pairs with these.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Common filler words that add noise to name comparison.
const STOPWORDS: [&str; 19] = [
    "a", "an", "the", "at", "in", "on", "of", "for", "and", "to", "with", "by", "is", "it",
    "this", "that", "from", "or", "as",
];

// ---------------------------------------------------------------------------
// Distance
// ---------------------------------------------------------------------------

/// Haversine great-circle distance between two lat/lng points in meters.
///
/// Callers must validate coordinate ranges upstream; behavior for
/// |lat| > 90 or |lng| > 180 is undefined.
pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_M * c
}

/// Haversine distance in kilometers, as reported to query clients.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    distance_meters(lat1, lng1, lat2, lng2) / 1000.0
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Best-effort parse of an ISO-8601-ish timestamp, with or without a UTC
/// suffix. Scraped feeds emit all three of `2025-03-01T19:00:00`,
/// `2025-03-01T19:00` and bare `2025-03-01`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let clean = raw.trim();
    let clean = clean.strip_suffix('Z').unwrap_or(clean);
    let clean = clean.strip_suffix("+00:00").unwrap_or(clean);

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(clean, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(clean, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Calendar date of a timestamp string, used as the temporal blocking key.
pub fn date_key(raw: Option<&str>) -> Option<NaiveDate> {
    parse_timestamp(raw?).map(|dt| dt.date())
}

/// Absolute difference in seconds between two timestamp strings.
///
/// Returns `None` when either side fails to parse — "unknown", never
/// "definitely different". Callers decide the policy for unknowns.
pub fn time_delta_seconds(a: Option<&str>, b: Option<&str>) -> Option<f64> {
    let da = parse_timestamp(a?)?;
    let db = parse_timestamp(b?)?;
    Some((da - db).num_seconds().abs() as f64)
}

// ---------------------------------------------------------------------------
// Name similarity
// ---------------------------------------------------------------------------

/// Lowercase a name, split on alphanumeric runs, drop stopwords.
pub fn name_tokens(name: &str) -> HashSet<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity between the token sets of two event names, in [0, 1].
///
/// When either side tokenizes to nothing (blank or all-stopword name) this
/// returns 1.0: a garbage name must not veto an otherwise-strong geo+time
/// match. That biases dedup toward false positives over false negatives —
/// a deliberate, tunable policy, not an accident.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let ta = name_tokens(a);
    let tb = name_tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    intersection as f64 / union as f64
}
