//! Cross-source event matching engine.
//!
//! Two data paths share one scoring primitive:
//!
//! - **write path**: [`resolver::Deduper`] drops newly scraped rows that
//!   duplicate already-persisted events (or earlier rows in the same batch),
//!   using grid-cell + calendar-date blocking so only nearby same-day pairs
//!   are ever scored.
//! - **read path**: [`ranker::rank`] annotates fetched rows with a distance
//!   from the caller's coordinate, applies an optional radius cutoff, sorts,
//!   and paginates.
//!
//! The engine performs no I/O and holds no cross-call state: callers hand it
//! already-materialized row lists and get transformed lists back.

pub mod index;
pub mod ranker;
pub mod resolver;
pub mod score;

pub use ranker::{rank, QueryOptions, RankedEvent, SortKey};
pub use resolver::{DedupOutcome, Deduper};
