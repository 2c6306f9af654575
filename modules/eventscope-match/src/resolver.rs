//! Cross-source duplicate resolution for newly scraped event batches.
//!
//! Scrapers disagree on URLs, names, and formatting for the same real-world
//! event, so a key-based union of sources produces duplicate rows. The
//! resolver blocks candidates by grid cell + calendar date, then scores each
//! blocked pair on haversine distance, start-time proximity, and Jaccard name
//! similarity. On any match the new row is dropped: persisted rows are
//! immutable ground truth, and within a batch the first-accepted row wins.

use std::collections::HashSet;

use tracing::{debug, info};

use eventscope_common::{EventRecord, EventScopeError, MatchConfig, Origin};

use crate::index::{EventRef, SpatialIndex};
use crate::score;

/// Result of one dedup pass. Kept rows preserve original batch order; the
/// dropped identifiers are returned so callers choose how to surface them
/// (logs, metrics) instead of the matching loop reporting on its own.
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub kept: Vec<EventRecord>,
    pub duplicates_removed: usize,
    pub dropped_identifiers: Vec<String>,
}

/// Cross-source deduplicator. Construction validates thresholds up front;
/// each call to [`Deduper::deduplicate`] builds its own index, so independent
/// batches can run concurrently on separate instances or the same one.
#[derive(Debug, Clone)]
pub struct Deduper {
    cfg: MatchConfig,
}

impl Deduper {
    /// Fails fast on invalid thresholds rather than clamping them.
    pub fn new(cfg: MatchConfig) -> Result<Self, EventScopeError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Remove rows from `new_rows` that duplicate a persisted event or an
    /// earlier-accepted row in the same batch.
    ///
    /// For each new row in batch order:
    /// 1. probe the persisted index across the 3×3 cell neighborhood for the
    ///    row's date; the first persisted row passing the pair test wins and
    ///    the new row is dropped (persisted rows are never altered);
    /// 2. otherwise run the same test against already-accepted batch rows
    ///    (first-accepted wins);
    /// 3. otherwise accept the row and index it for later batch rows.
    ///
    /// Rows missing a coordinate never match anything and are always kept.
    /// Rows whose timestamp fails to parse lose only their temporal signal.
    pub fn deduplicate(&self, new_rows: Vec<EventRecord>, persisted: &[EventRecord]) -> DedupOutcome {
        let step = self.cfg.grid_step_deg;

        let persisted_index = SpatialIndex::from_refs(
            step,
            persisted
                .iter()
                .enumerate()
                .filter_map(|(i, r)| EventRef::from_record(r, Origin::Persisted, i)),
        );

        let new_refs: Vec<EventRef> = new_rows
            .iter()
            .enumerate()
            .filter_map(|(i, r)| EventRef::from_record(r, Origin::Batch, i))
            .collect();

        debug!(
            batch = new_rows.len(),
            indexable = new_refs.len(),
            persisted = persisted_index.len(),
            "starting dedup pass"
        );

        let mut accepted_index = SpatialIndex::new(step);
        let mut duplicate_positions: HashSet<usize> = HashSet::new();
        let mut dropped_identifiers = Vec::new();

        for nref in new_refs {
            let cell = accepted_index.cell(nref.lat, nref.lng);
            let date = nref.date_key();

            // Persisted candidates first, then earlier-accepted batch rows.
            let is_dup = persisted_index
                .probe(cell, date)
                .any(|p| self.pair_matches(&nref, p))
                || accepted_index
                    .probe(cell, date)
                    .any(|p| self.pair_matches(&nref, p));

            if is_dup {
                duplicate_positions.insert(nref.position);
                dropped_identifiers.push(nref.identifier);
            } else {
                accepted_index.insert(nref);
            }
        }

        let kept: Vec<EventRecord> = new_rows
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !duplicate_positions.contains(i))
            .map(|(_, r)| r)
            .collect();

        info!(
            kept = kept.len(),
            duplicates_removed = dropped_identifiers.len(),
            "dedup pass complete"
        );

        DedupOutcome {
            kept,
            duplicates_removed: dropped_identifiers.len(),
            dropped_identifiers,
        }
    }

    /// Dedup a single scraper's own output — the degenerate case with an
    /// empty persisted snapshot. Same index, same thresholds.
    pub fn dedup_within_batch(&self, rows: Vec<EventRecord>) -> DedupOutcome {
        self.deduplicate(rows, &[])
    }

    /// The three-condition pair test:
    /// distance ≤ max AND (time delta unknown OR ≤ max) AND similarity ≥ min.
    ///
    /// Equal non-empty identifiers are not a duplicate here — same-URL rows
    /// are the store's upsert territory, and counting them would double-drop.
    fn pair_matches(&self, new: &EventRef, existing: &EventRef) -> bool {
        if !new.identifier.is_empty()
            && !existing.identifier.is_empty()
            && new.identifier == existing.identifier
        {
            return false;
        }

        let dist = score::distance_meters(new.lat, new.lng, existing.lat, existing.lng);
        if dist > self.cfg.max_distance_m {
            return false;
        }

        if let Some(delta) =
            score::time_delta_seconds(new.starts_at.as_deref(), existing.starts_at.as_deref())
        {
            if delta > self.cfg.max_time_diff_s {
                return false;
            }
        }

        score::name_similarity(&new.name, &existing.name) >= self.cfg.min_name_similarity
    }
}
