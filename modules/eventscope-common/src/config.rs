use std::env;

use crate::error::EventScopeError;

/// Matching thresholds for the dedup pass, loadable from environment
/// variables with sensible defaults.
///
/// The grid step default of 0.005° is roughly 500–550 m at tropical
/// latitudes. Degree-to-meter conversion is latitude-dependent, so
/// deployments far from the equator should recompute an appropriate step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    /// Spatial blocking cell size in degrees.
    pub grid_step_deg: f64,
    /// Maximum haversine distance (meters) for two events to be co-located.
    pub max_distance_m: f64,
    /// Maximum start-time difference (seconds) for two events to be concurrent.
    pub max_time_diff_s: f64,
    /// Minimum Jaccard token similarity (0–1) for two names to match.
    pub min_name_similarity: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            grid_step_deg: 0.005,
            max_distance_m: 500.0,
            max_time_diff_s: 3600.0,
            min_name_similarity: 0.3,
        }
    }
}

impl MatchConfig {
    /// Load thresholds from environment variables, falling back to defaults.
    /// Returns a `Config` error on unparseable or out-of-range values rather
    /// than clamping — a silently clamped threshold masks a misconfigured run.
    pub fn from_env() -> Result<Self, EventScopeError> {
        let cfg = Self {
            grid_step_deg: env_f64("EVENTSCOPE_GRID_STEP_DEG", 0.005)?,
            max_distance_m: env_f64("EVENTSCOPE_MAX_DISTANCE_M", 500.0)?,
            max_time_diff_s: env_f64("EVENTSCOPE_MAX_TIME_DIFF_S", 3600.0)?,
            min_name_similarity: env_f64("EVENTSCOPE_MIN_NAME_SIMILARITY", 0.3)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject invalid thresholds up front, before any matching runs.
    pub fn validate(&self) -> Result<(), EventScopeError> {
        if !(self.grid_step_deg > 0.0) {
            return Err(EventScopeError::Config(format!(
                "grid_step_deg must be positive, got {}",
                self.grid_step_deg
            )));
        }
        if !(self.max_distance_m >= 0.0) {
            return Err(EventScopeError::Config(format!(
                "max_distance_m must be non-negative, got {}",
                self.max_distance_m
            )));
        }
        if !(self.max_time_diff_s >= 0.0) {
            return Err(EventScopeError::Config(format!(
                "max_time_diff_s must be non-negative, got {}",
                self.max_time_diff_s
            )));
        }
        if !(0.0..=1.0).contains(&self.min_name_similarity) {
            return Err(EventScopeError::Config(format!(
                "min_name_similarity must be within [0, 1], got {}",
                self.min_name_similarity
            )));
        }
        Ok(())
    }
}

fn env_f64(key: &str, default: f64) -> Result<f64, EventScopeError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| EventScopeError::Config(format!("{key} must be a number, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}
