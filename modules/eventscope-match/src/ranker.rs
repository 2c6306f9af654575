//! Query-time distance annotation, filtering, and ranking.
//!
//! A pure transform over rows the store has already fetched: annotate each
//! with the distance from the caller's coordinate, apply an optional radius
//! cutoff, sort, and slice a page. No I/O, no persisted state.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use eventscope_common::{EventRecord, EventScopeError, GeoPoint};

use crate::score;

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Distance,
    Date,
    Name,
}

/// Options for one ranking pass, as handed over by the HTTP layer after
/// request validation.
#[derive(Debug, Clone, TypedBuilder)]
pub struct QueryOptions {
    /// The caller's coordinate. Without it no distances are computable and
    /// any radius cutoff is inert.
    #[builder(default)]
    pub origin: Option<GeoPoint>,
    /// Radius cutoff in kilometers; only applied when `origin` is present.
    #[builder(default)]
    pub max_distance_km: Option<f64>,
    #[builder(default)]
    pub sort: SortKey,
    #[builder(default = 50)]
    pub limit: usize,
    #[builder(default = 0)]
    pub offset: usize,
}

impl QueryOptions {
    fn validate(&self) -> Result<(), EventScopeError> {
        if let Some(max) = self.max_distance_km {
            if !(max >= 0.0) {
                return Err(EventScopeError::Validation(format!(
                    "max_distance_km must be non-negative, got {max}"
                )));
            }
        }
        Ok(())
    }
}

/// An event row annotated with its distance from the query origin, rounded
/// to two decimal places for presentation stability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEvent {
    #[serde(flatten)]
    pub event: EventRecord,
    pub distance_km: Option<f64>,
}

/// Annotate, filter, sort, and paginate `rows`.
///
/// - the radius cutoff applies only when both an origin and a cutoff were
///   supplied; rows without a computable distance are dropped while it is
///   active;
/// - distance sort places rows with no computable distance last, date sort
///   places rows with no parseable date last, name sort is case-insensitive
///   lexical; ties keep their input order;
/// - the offset/limit slice runs after filtering and sorting.
pub fn rank(
    rows: Vec<EventRecord>,
    opts: &QueryOptions,
) -> Result<Vec<RankedEvent>, EventScopeError> {
    opts.validate()?;

    let mut ranked: Vec<RankedEvent> = rows
        .into_iter()
        .map(|event| {
            let distance_km = match (opts.origin, event.lat, event.long) {
                (Some(origin), Some(lat), Some(lng)) => {
                    Some(round2(score::distance_km(origin.lat, origin.lng, lat, lng)))
                }
                _ => None,
            };
            RankedEvent { event, distance_km }
        })
        .collect();

    if opts.origin.is_some() {
        if let Some(max) = opts.max_distance_km {
            ranked.retain(|r| r.distance_km.is_some_and(|d| d <= max));
        }
    }

    match opts.sort {
        SortKey::Distance => ranked.sort_by(|a, b| {
            let da = a.distance_km.unwrap_or(f64::INFINITY);
            let db = b.distance_km.unwrap_or(f64::INFINITY);
            da.total_cmp(&db)
        }),
        SortKey::Date => ranked.sort_by_key(|r| date_rank(&r.event)),
        SortKey::Name => ranked.sort_by_key(|r| r.event.name.to_lowercase()),
    }

    Ok(ranked
        .into_iter()
        .skip(opts.offset)
        .take(opts.limit)
        .collect())
}

/// Missing or unparseable dates sort last.
fn date_rank(event: &EventRecord) -> NaiveDateTime {
    event
        .start_date
        .as_deref()
        .and_then(score::parse_timestamp)
        .unwrap_or(NaiveDateTime::MAX)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
