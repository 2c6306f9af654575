//! Spatial-temporal blocking index.
//!
//! Events are bucketed by (grid cell, calendar date) so pairwise scoring only
//! ever touches candidates that could plausibly match. The index is rebuilt
//! from scratch for every pass — no cross-run state. Probes always scan the
//! 3×3 cell neighborhood sharing the date key, so pairs straddling a cell
//! boundary are still compared (bounded ≤9× overhead per probe).
//!
//! No normalization or wraparound is applied at ±180° longitude or the poles.

use std::collections::HashMap;

use chrono::NaiveDate;
use eventscope_common::{EventRecord, Origin};

use crate::score;

/// Integer grid cell obtained by flooring lat/lng divided by the step size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub row: i32,
    pub col: i32,
}

impl GridCell {
    pub fn of(lat: f64, lng: f64, step_deg: f64) -> Self {
        Self {
            row: (lat / step_deg).floor() as i32,
            col: (lng / step_deg).floor() as i32,
        }
    }

    /// This cell plus its 8 neighbors, in deterministic row-major order.
    pub fn neighborhood(self) -> impl Iterator<Item = GridCell> {
        (-1..=1).flat_map(move |dr| {
            (-1..=1).map(move |dc| GridCell {
                row: self.row + dr,
                col: self.col + dc,
            })
        })
    }
}

/// Lightweight projection of an event used only for matching. Built per pass
/// and discarded with it.
#[derive(Debug, Clone)]
pub struct EventRef {
    /// Stable dedup key, preferably the source URL. May be empty when a
    /// scraper truly has none; empty identifiers never short-circuit matching.
    pub identifier: String,
    pub lat: f64,
    pub lng: f64,
    pub starts_at: Option<String>,
    pub name: String,
    pub origin: Origin,
    /// Ordinal in the source list; used only as a first-seen tie-break.
    pub position: usize,
}

impl EventRef {
    /// Project a row for matching. Rows missing either coordinate are
    /// non-indexable and return `None` — they can neither match nor be
    /// matched, and are passed through a dedup pass untouched.
    pub fn from_record(record: &EventRecord, origin: Origin, position: usize) -> Option<Self> {
        let (lat, lng) = (record.lat?, record.long?);
        Some(Self {
            identifier: record.url.clone(),
            lat,
            lng,
            starts_at: record.start_date.clone(),
            name: record.name.clone(),
            origin,
            position,
        })
    }

    pub fn date_key(&self) -> Option<NaiveDate> {
        score::date_key(self.starts_at.as_deref())
    }
}

/// Mapping from (grid cell, date) to the events in that bucket, in insertion
/// order. Insertion order matters: within a bucket the earliest-accepted row
/// is the one later duplicates resolve against.
#[derive(Debug)]
pub struct SpatialIndex {
    step_deg: f64,
    buckets: HashMap<(GridCell, Option<NaiveDate>), Vec<EventRef>>,
}

impl SpatialIndex {
    pub fn new(step_deg: f64) -> Self {
        Self {
            step_deg,
            buckets: HashMap::new(),
        }
    }

    /// Bulk-build from a set of refs in one linear pass.
    pub fn from_refs(step_deg: f64, refs: impl IntoIterator<Item = EventRef>) -> Self {
        let mut index = Self::new(step_deg);
        for r in refs {
            index.insert(r);
        }
        index
    }

    pub fn cell(&self, lat: f64, lng: f64) -> GridCell {
        GridCell::of(lat, lng, self.step_deg)
    }

    pub fn insert(&mut self, r: EventRef) {
        let key = (self.cell(r.lat, r.lng), r.date_key());
        self.buckets.entry(key).or_default().push(r);
    }

    /// All refs in the 3×3 neighborhood of `cell` sharing `date`, bucket by
    /// bucket in neighborhood order, insertion order within each bucket.
    pub fn probe(
        &self,
        cell: GridCell,
        date: Option<NaiveDate>,
    ) -> impl Iterator<Item = &EventRef> {
        cell.neighborhood()
            .filter_map(move |c| self.buckets.get(&(c, date)))
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, lat: Option<f64>, lng: Option<f64>, start: Option<&str>) -> EventRecord {
        EventRecord {
            url: url.to_string(),
            name: "Test Event".to_string(),
            lat,
            long: lng,
            start_date: start.map(str::to_string),
            venue: None,
            source: None,
        }
    }

    fn event_ref(url: &str, lat: f64, lng: f64, start: Option<&str>) -> EventRef {
        EventRef::from_record(&record(url, Some(lat), Some(lng), start), Origin::Batch, 0).unwrap()
    }

    // --- grid cells ---

    #[test]
    fn grid_cell_floors_toward_negative_infinity() {
        assert_eq!(GridCell::of(12.9716, 77.5946, 0.005), GridCell { row: 2594, col: 15518 });
        assert_eq!(GridCell::of(-0.001, -0.001, 0.005), GridCell { row: -1, col: -1 });
    }

    #[test]
    fn neighborhood_is_nine_cells_centered() {
        let cells: Vec<_> = GridCell { row: 0, col: 0 }.neighborhood().collect();
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&GridCell { row: 0, col: 0 }));
        assert!(cells.contains(&GridCell { row: -1, col: 1 }));
        assert!(!cells.contains(&GridCell { row: 2, col: 0 }));
    }

    // --- projection ---

    #[test]
    fn missing_coordinate_is_not_indexable() {
        let r = record("u", Some(12.97), None, None);
        assert!(EventRef::from_record(&r, Origin::Batch, 0).is_none());
        let r = record("u", None, Some(77.59), None);
        assert!(EventRef::from_record(&r, Origin::Persisted, 0).is_none());
    }

    #[test]
    fn unparseable_start_degrades_to_undated() {
        let r = event_ref("u", 12.97, 77.59, Some("sometime in march"));
        assert_eq!(r.date_key(), None);
    }

    // --- index ---

    #[test]
    fn probe_finds_same_cell_same_date() {
        let index = SpatialIndex::from_refs(
            0.005,
            vec![event_ref("a", 12.9716, 77.5946, Some("2025-03-01"))],
        );
        let cell = index.cell(12.9716, 77.5946);
        let hits: Vec<_> = index.probe(cell, date_of("2025-03-01")).collect();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn probe_crosses_cell_boundary() {
        // Two points ~60m apart but in adjacent longitude cells
        let index = SpatialIndex::from_refs(
            0.005,
            vec![event_ref("a", 12.9720, 77.5950, Some("2025-03-01"))],
        );
        let cell = index.cell(12.9716, 77.5946);
        assert_ne!(cell, index.cell(12.9720, 77.5950));
        let hits: Vec<_> = index.probe(cell, date_of("2025-03-01")).collect();
        assert_eq!(hits.len(), 1, "neighbor probe should cross the boundary");
    }

    #[test]
    fn probe_does_not_mix_dates() {
        let index = SpatialIndex::from_refs(
            0.005,
            vec![event_ref("a", 12.9716, 77.5946, Some("2025-03-01"))],
        );
        let cell = index.cell(12.9716, 77.5946);
        assert_eq!(index.probe(cell, date_of("2025-03-02")).count(), 0);
        assert_eq!(index.probe(cell, None).count(), 0);
    }

    #[test]
    fn undated_events_bucket_together() {
        let index = SpatialIndex::from_refs(
            0.005,
            vec![
                event_ref("a", 12.9716, 77.5946, None),
                event_ref("b", 12.9717, 77.5947, None),
            ],
        );
        let cell = index.cell(12.9716, 77.5946);
        assert_eq!(index.probe(cell, None).count(), 2);
    }

    #[test]
    fn bucket_preserves_insertion_order() {
        let mut index = SpatialIndex::new(0.005);
        index.insert(event_ref("first", 12.9716, 77.5946, None));
        index.insert(event_ref("second", 12.9716, 77.5946, None));
        let ids: Vec<_> = index
            .probe(index.cell(12.9716, 77.5946), None)
            .map(|r| r.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn len_counts_refs_across_buckets() {
        let index = SpatialIndex::from_refs(
            0.005,
            vec![
                event_ref("a", 12.97, 77.59, Some("2025-03-01")),
                event_ref("b", 13.05, 77.65, Some("2025-03-02")),
            ],
        );
        assert_eq!(index.len(), 2);
        assert!(!index.is_empty());
        assert!(SpatialIndex::new(0.005).is_empty());
    }

    fn date_of(s: &str) -> Option<NaiveDate> {
        score::date_key(Some(s))
    }
}
