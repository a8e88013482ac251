//! Configuration types for scoring, ranking, and auto-tuning.

use pyo3::prelude::*;

/// Configuration for recommendation generation.
#[pyclass]
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Score every trainset starts from before penalties
    #[pyo3(get, set)]
    pub base_score: i32,
    /// Scores strictly below this go to maintenance
    #[pyo3(get, set)]
    pub maintenance_below: i32,
    /// Scores at or above this enter revenue service; the gap between is standby
    #[pyo3(get, set)]
    pub revenue_service_from: i32,
    /// Lookback window echoed by the tuner when the caller gives none
    #[pyo3(get, set)]
    pub default_lookback_days: u32,
    /// Verbosity level: 0=silent, 1=decisions, 2=checks, 3=debug
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_score: 100,
            maintenance_below: 50,
            revenue_service_from: 70,
            default_lookback_days: 14,
            verbosity: 0,
        }
    }
}

#[pymethods]
impl EngineConfig {
    #[new]
    #[pyo3(signature = (
        base_score=None,
        maintenance_below=None,
        revenue_service_from=None,
        default_lookback_days=None,
        verbosity=None
    ))]
    fn new(
        base_score: Option<i32>,
        maintenance_below: Option<i32>,
        revenue_service_from: Option<i32>,
        default_lookback_days: Option<u32>,
        verbosity: Option<u8>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            base_score: base_score.unwrap_or(defaults.base_score),
            maintenance_below: maintenance_below.unwrap_or(defaults.maintenance_below),
            revenue_service_from: revenue_service_from.unwrap_or(defaults.revenue_service_from),
            default_lookback_days: default_lookback_days.unwrap_or(defaults.default_lookback_days),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "EngineConfig(base_score={}, maintenance_below={}, revenue_service_from={})",
            self.base_score, self.maintenance_below, self.revenue_service_from
        )
    }
}

/// Coefficients of the penalty auto-tuning formulas.
///
/// `penalty_high_priority_jobs = min(cap, round(high_priority_base + avg * high_priority_per_job))`
/// `penalty_expiring_certificate = min(cap, round(expiring_base + ratio * expiring_scale))`
#[pyclass]
#[derive(Clone, Debug)]
pub struct TuningConfig {
    #[pyo3(get, set)]
    pub high_priority_base: f64,
    #[pyo3(get, set)]
    pub high_priority_per_job: f64,
    #[pyo3(get, set)]
    pub expiring_base: f64,
    #[pyo3(get, set)]
    pub expiring_scale: f64,
    /// Upper bound applied to both tuned penalties
    #[pyo3(get, set)]
    pub penalty_cap: f64,
    /// A certificate counts as expiring soon when valid_until <= now + this many hours
    #[pyo3(get, set)]
    pub expiry_horizon_hours: i64,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            high_priority_base: 20.0,
            high_priority_per_job: 10.0,
            expiring_base: 40.0,
            expiring_scale: 40.0,
            penalty_cap: 80.0,
            expiry_horizon_hours: 48,
        }
    }
}

#[pymethods]
impl TuningConfig {
    #[new]
    #[pyo3(signature = (
        high_priority_base=None,
        high_priority_per_job=None,
        expiring_base=None,
        expiring_scale=None,
        penalty_cap=None,
        expiry_horizon_hours=None
    ))]
    fn new(
        high_priority_base: Option<f64>,
        high_priority_per_job: Option<f64>,
        expiring_base: Option<f64>,
        expiring_scale: Option<f64>,
        penalty_cap: Option<f64>,
        expiry_horizon_hours: Option<i64>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            high_priority_base: high_priority_base.unwrap_or(defaults.high_priority_base),
            high_priority_per_job: high_priority_per_job.unwrap_or(defaults.high_priority_per_job),
            expiring_base: expiring_base.unwrap_or(defaults.expiring_base),
            expiring_scale: expiring_scale.unwrap_or(defaults.expiring_scale),
            penalty_cap: penalty_cap.unwrap_or(defaults.penalty_cap),
            expiry_horizon_hours: expiry_horizon_hours.unwrap_or(defaults.expiry_horizon_hours),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "TuningConfig(penalty_cap={}, expiry_horizon_hours={})",
            self.penalty_cap, self.expiry_horizon_hours
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.base_score, 100);
        assert_eq!(config.maintenance_below, 50);
        assert_eq!(config.revenue_service_from, 70);
        assert_eq!(config.default_lookback_days, 14);
        assert_eq!(config.verbosity, 0);
    }

    #[test]
    fn test_partial_constructor_keeps_defaults() {
        let config = EngineConfig::new(None, Some(40), None, None, Some(2));
        assert_eq!(config.maintenance_below, 40);
        assert_eq!(config.revenue_service_from, 70);
        assert_eq!(config.verbosity, 2);

        let tuning = TuningConfig::new(None, None, None, None, Some(60.0), None);
        assert!((tuning.penalty_cap - 60.0).abs() < 1e-9);
        assert_eq!(tuning.expiry_horizon_hours, 48);
    }
}
