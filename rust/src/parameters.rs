//! Named scoring parameters: storage records, seeding, and resolution.

use chrono::{DateTime, Utc};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyBool;
use std::fmt;

use crate::engine::EngineError;
use crate::log_decisions;
use crate::store::FactRepository;

pub const PENALTY_EXPIRING_CERTIFICATE: &str = "penalty_expiring_certificate";
pub const PENALTY_HIGH_PRIORITY_JOBS: &str = "penalty_high_priority_jobs";

pub const DEFAULT_PENALTY_EXPIRING_CERTIFICATE: i32 = 50;
pub const DEFAULT_PENALTY_HIGH_PRIORITY_JOBS: i32 = 30;

const SEED_EXPIRING_DESCRIPTION: &str =
    "Penalty applied when a fitness certificate expires before tomorrow";
const SEED_HIGH_PRIORITY_DESCRIPTION: &str =
    "Penalty applied when there are open HIGH priority job cards";

/// Value of an optimization parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Flag(b) => write!(f, "{}", b),
            ParamValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl<'py> FromPyObject<'py> for ParamValue {
    fn extract_bound(ob: &Bound<'py, PyAny>) -> PyResult<Self> {
        // bool is a subclass of int in Python, so it must be checked first
        if ob.is_instance_of::<PyBool>() {
            return Ok(ParamValue::Flag(ob.extract()?));
        }
        if let Ok(n) = ob.extract::<f64>() {
            return Ok(ParamValue::Number(n));
        }
        if let Ok(s) = ob.extract::<String>() {
            return Ok(ParamValue::Text(s));
        }
        Err(PyValueError::new_err(
            "parameter value must be a number, bool, or str",
        ))
    }
}

impl IntoPy<PyObject> for ParamValue {
    fn into_py(self, py: Python<'_>) -> PyObject {
        match self {
            ParamValue::Number(n) => n.into_py(py),
            ParamValue::Flag(b) => b.into_py(py),
            ParamValue::Text(s) => s.into_py(py),
        }
    }
}

/// A named scalar with last-write metadata. Names are unique.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizationParameter {
    #[pyo3(get)]
    pub id: u64,
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub value: ParamValue,
    #[pyo3(get)]
    pub description: String,
    #[pyo3(get)]
    pub last_updated: DateTime<Utc>,
    #[pyo3(get)]
    pub updated_by: String,
}

#[pymethods]
impl OptimizationParameter {
    fn __repr__(&self) -> String {
        format!(
            "OptimizationParameter(name={:?}, value={}, updated_by={:?})",
            self.name, self.value, self.updated_by
        )
    }
}

/// Penalties handed to the scorer for one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoringParams {
    /// Subtracted once per active certificate expiring before the cutoff.
    pub penalty_expiring_certificate: i32,
    /// Subtracted once if any high-priority job card is open.
    pub penalty_high_priority_jobs: i32,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            penalty_expiring_certificate: DEFAULT_PENALTY_EXPIRING_CERTIFICATE,
            penalty_high_priority_jobs: DEFAULT_PENALTY_HIGH_PRIORITY_JOBS,
        }
    }
}

impl ScoringParams {
    /// Read both penalties from the repository, falling back to defaults for unset names.
    pub fn resolve<R: FactRepository + ?Sized>(repo: &R) -> Result<Self, EngineError> {
        Ok(Self {
            penalty_expiring_certificate: resolve_penalty(
                repo,
                PENALTY_EXPIRING_CERTIFICATE,
                DEFAULT_PENALTY_EXPIRING_CERTIFICATE,
            )?,
            penalty_high_priority_jobs: resolve_penalty(
                repo,
                PENALTY_HIGH_PRIORITY_JOBS,
                DEFAULT_PENALTY_HIGH_PRIORITY_JOBS,
            )?,
        })
    }
}

fn resolve_penalty<R: FactRepository + ?Sized>(
    repo: &R,
    name: &str,
    default: i32,
) -> Result<i32, EngineError> {
    match repo.find_parameter(name)? {
        None => Ok(default),
        Some(param) => match param.value.as_number() {
            Some(n) if n.is_finite() => Ok(n.round() as i32),
            _ => Err(EngineError::Validation(format!(
                "parameter {} must be a finite number, found {}",
                name, param.value
            ))),
        },
    }
}

/// Insert or overwrite a parameter by name, stamping `actor` and `now`.
pub fn upsert_parameter<R: FactRepository + ?Sized>(
    repo: &R,
    name: &str,
    value: ParamValue,
    description: &str,
    actor: &str,
    now: DateTime<Utc>,
    verbosity: u8,
) -> Result<u64, EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::Validation(
            "parameter name must not be empty".to_string(),
        ));
    }
    log_decisions!(verbosity, "Parameter {} <- {} by {}", name, value, actor);
    Ok(repo.upsert_parameter(name, value, description, actor, now)?)
}

/// Write both penalties at their defaults. Always overwrites earlier values.
pub fn seed_default_parameters<R: FactRepository + ?Sized>(
    repo: &R,
    actor: &str,
    now: DateTime<Utc>,
    verbosity: u8,
) -> Result<(), EngineError> {
    upsert_parameter(
        repo,
        PENALTY_EXPIRING_CERTIFICATE,
        ParamValue::Number(DEFAULT_PENALTY_EXPIRING_CERTIFICATE as f64),
        SEED_EXPIRING_DESCRIPTION,
        actor,
        now,
        verbosity,
    )?;
    upsert_parameter(
        repo,
        PENALTY_HIGH_PRIORITY_JOBS,
        ParamValue::Number(DEFAULT_PENALTY_HIGH_PRIORITY_JOBS as f64),
        SEED_HIGH_PRIORITY_DESCRIPTION,
        actor,
        now,
        verbosity,
    )?;
    Ok(())
}
