use serde::{Deserialize, Serialize};

// --- Geo types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

// --- Event rows ---

/// One event row as produced by a scraper or read back from the store.
///
/// `url` is the stable upsert key. Coordinates and the start timestamp are
/// optional because scrapers frequently fail to resolve them; rows without
/// coordinates cannot participate in spatial matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub url: String,
    #[serde(default)]
    pub name: String,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    /// ISO-8601 date or date-time string, best-effort parsed downstream.
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    pub venue: Option<String>,
    pub source: Option<String>,
}

impl EventRecord {
    /// Both coordinates present, i.e. the row is usable for spatial matching.
    pub fn has_coordinates(&self) -> bool {
        self.lat.is_some() && self.long.is_some()
    }
}

/// Where a matching candidate came from. Persisted rows are immutable ground
/// truth for a dedup pass: on any conflict the batch side is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Persisted,
    Batch,
}
