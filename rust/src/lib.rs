//! Rust implementation of the metro fleet induction engine.
//!
//! Scores every active trainset from its fitness certificates and open job
//! cards, ranks the fleet into revenue service, standby, and maintenance,
//! persists daily plans, auto-tunes the scoring penalties, and tracks
//! operational alerts.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::{DateTime, Utc};
use pyo3::exceptions::{PyKeyError, PyPermissionError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

pub mod alerts;
mod config;
pub mod engine;
pub mod logging;
mod models;
pub mod parameters;
pub mod ranking;
pub mod scoring;
pub mod store;
pub mod tuning;

pub use alerts::NewAlert;
pub use config::{EngineConfig, TuningConfig};
pub use engine::{parse_date, EngineError, InductionEngine};
pub use models::{
    Alert, AlertSeverity, AlertType, AlertView, CertificateType, Decision, DecisionInput,
    FitnessCertificate, FleetStats, InductionDecision, JobCard, JobCardStatus, ParseEnumError,
    PlannedInduction, Recommendation, Trainset, TrainsetStatus, HIGH_PRIORITY,
};
pub use parameters::{OptimizationParameter, ParamValue, ScoringParams};
pub use ranking::{classify, format_reasoning, rank, ScoredTrainset};
pub use scoring::{expiry_cutoff, score_trainset, TrainsetScore};
pub use store::{FactRepository, MemoryStore, StoreError};
pub use tuning::{compute_tuning, TuningResult, TuningStats};

impl From<EngineError> for PyErr {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::Unauthorized(_) => PyPermissionError::new_err(message),
            EngineError::NotFound { .. } => PyKeyError::new_err(message),
            EngineError::Validation(_) => PyValueError::new_err(message),
            EngineError::Store(_) => PyRuntimeError::new_err(message),
        }
    }
}

impl From<StoreError> for PyErr {
    fn from(err: StoreError) -> Self {
        EngineError::from(err).into()
    }
}

/// Induction engine over an in-process fact store (PyO3 wrapper).
#[pyclass(name = "InductionEngine")]
pub struct PyInductionEngine {
    inner: InductionEngine<MemoryStore>,
}

#[pymethods]
impl PyInductionEngine {
    #[new]
    #[pyo3(signature = (config=None, tuning=None))]
    fn new(config: Option<EngineConfig>, tuning: Option<TuningConfig>) -> Self {
        Self {
            inner: InductionEngine::new(
                MemoryStore::new(),
                config.unwrap_or_default(),
                tuning.unwrap_or_default(),
            ),
        }
    }

    fn add_trainset(&self, trainset: Trainset) -> PyResult<()> {
        Ok(self.inner.repository().insert_trainset(trainset)?)
    }

    fn add_certificate(&self, certificate: FitnessCertificate) -> PyResult<()> {
        Ok(self.inner.repository().insert_certificate(certificate)?)
    }

    fn add_job_card(&self, job_card: JobCard) -> PyResult<()> {
        Ok(self.inner.repository().insert_job_card(job_card)?)
    }

    #[pyo3(signature = (trainset_id, status, location=None))]
    fn update_trainset_status(
        &self,
        trainset_id: &str,
        status: TrainsetStatus,
        location: Option<String>,
    ) -> PyResult<()> {
        Ok(self
            .inner
            .repository()
            .update_trainset_status(trainset_id, status, location)?)
    }

    /// Score and rank all active trainsets for an ISO date. Nothing is saved.
    fn generate_recommendations(&self, date: &str) -> PyResult<Vec<Recommendation>> {
        Ok(self.inner.generate_recommendations(date)?)
    }

    /// Replace the plan for `date`. Returns the committed records.
    ///
    /// Raises ValueError for a malformed payload (nothing is written) and
    /// KeyError when a decision names an unknown trainset.
    #[pyo3(signature = (date, decisions, actor, now=None))]
    fn save_decisions(
        &self,
        date: &str,
        decisions: Vec<DecisionInput>,
        actor: &str,
        now: Option<DateTime<Utc>>,
    ) -> PyResult<Vec<InductionDecision>> {
        let now = now.unwrap_or_else(Utc::now);
        Ok(self.inner.save_decisions_at(date, &decisions, actor, now)?)
    }

    /// Saved plan for `date` by priority, each entry joined with its trainset.
    fn decisions_for_date(&self, date: &str) -> PyResult<Vec<PlannedInduction>> {
        Ok(self.inner.decisions_for_date(date)?)
    }

    /// Overwrite both scoring penalties with their defaults.
    #[pyo3(signature = (actor, now=None))]
    fn seed_default_parameters(&self, actor: &str, now: Option<DateTime<Utc>>) -> PyResult<bool> {
        self.inner
            .seed_default_parameters_at(actor, now.unwrap_or_else(Utc::now))?;
        Ok(true)
    }

    #[pyo3(signature = (actor, lookback_days=None, now=None))]
    fn train_from_history(
        &self,
        actor: &str,
        lookback_days: Option<u32>,
        now: Option<DateTime<Utc>>,
    ) -> PyResult<TuningResult> {
        Ok(self
            .inner
            .train_from_history_at(lookback_days, actor, now.unwrap_or_else(Utc::now))?)
    }

    #[pyo3(signature = (name, value, description, actor, now=None))]
    fn upsert_parameter(
        &self,
        name: &str,
        value: ParamValue,
        description: &str,
        actor: &str,
        now: Option<DateTime<Utc>>,
    ) -> PyResult<u64> {
        Ok(parameters::upsert_parameter(
            self.inner.repository(),
            name,
            value,
            description,
            actor,
            now.unwrap_or_else(Utc::now),
            self.inner.config().verbosity,
        )?)
    }

    fn get_parameter(&self, name: &str) -> PyResult<Option<OptimizationParameter>> {
        Ok(self.inner.repository().find_parameter(name)?)
    }

    fn fleet_stats(&self) -> PyResult<FleetStats> {
        Ok(self.inner.fleet_stats()?)
    }

    /// Raise an alert. Raises ValueError for an unknown type or severity
    /// and KeyError when `trainset_id` names no stored trainset.
    #[pyo3(signature = (alert_type, severity, title, message, trainset_id=None, now=None))]
    fn create_alert(
        &self,
        alert_type: AlertType,
        severity: AlertSeverity,
        title: String,
        message: String,
        trainset_id: Option<String>,
        now: Option<DateTime<Utc>>,
    ) -> PyResult<Alert> {
        let alert = NewAlert {
            alert_type,
            severity,
            title,
            message,
            trainset_id,
        };
        Ok(self
            .inner
            .create_alert_at(alert, now.unwrap_or_else(Utc::now))?)
    }

    /// Unresolved alerts, critical first.
    fn active_alerts(&self) -> PyResult<Vec<AlertView>> {
        Ok(self.inner.active_alerts()?)
    }

    fn mark_alert_read(&self, alert_id: u64) -> PyResult<Alert> {
        Ok(self.inner.mark_alert_read(alert_id)?)
    }

    #[pyo3(signature = (alert_id, actor, now=None))]
    fn resolve_alert(
        &self,
        alert_id: u64,
        actor: &str,
        now: Option<DateTime<Utc>>,
    ) -> PyResult<Alert> {
        Ok(self
            .inner
            .resolve_alert_at(alert_id, actor, now.unwrap_or_else(Utc::now))?)
    }

    fn __repr__(&self) -> String {
        format!("InductionEngine(config={:?})", self.inner.config())
    }
}

/// Score one trainset's facts without a store.
///
/// # Arguments
/// * `certificates` - Certificates of the trainset (inactive ones are ignored)
/// * `open_job_cards` - Non-closed job cards of the trainset
/// * `date` - ISO decision date; the expiry cutoff is midnight UTC of the next day
/// * `penalty_expiring_certificate` / `penalty_high_priority_jobs` - Penalties to apply
///
/// # Returns
/// * (score, constraints)
///
/// # Raises
/// * ValueError if the date cannot be parsed
#[pyfunction]
#[pyo3(signature = (
    certificates,
    open_job_cards,
    date,
    penalty_expiring_certificate=parameters::DEFAULT_PENALTY_EXPIRING_CERTIFICATE,
    penalty_high_priority_jobs=parameters::DEFAULT_PENALTY_HIGH_PRIORITY_JOBS,
    config=None
))]
fn py_score_trainset(
    certificates: Vec<FitnessCertificate>,
    open_job_cards: Vec<JobCard>,
    date: &str,
    penalty_expiring_certificate: i32,
    penalty_high_priority_jobs: i32,
    config: Option<EngineConfig>,
) -> PyResult<(i32, Vec<String>)> {
    let as_of = parse_date(date)?;
    let params = ScoringParams {
        penalty_expiring_certificate,
        penalty_high_priority_jobs,
    };
    let result = score_trainset(
        &certificates,
        &open_job_cards,
        as_of,
        &params,
        &config.unwrap_or_default(),
    );
    Ok((result.score, result.constraints))
}

/// Compute tuned penalties from facts without writing them anywhere.
#[pyfunction]
#[pyo3(signature = (job_cards, certificates, now, lookback_days=14, config=None))]
fn py_compute_tuning(
    job_cards: Vec<JobCard>,
    certificates: Vec<FitnessCertificate>,
    now: DateTime<Utc>,
    lookback_days: u32,
    config: Option<TuningConfig>,
) -> TuningResult {
    compute_tuning(
        &job_cards,
        &certificates,
        now,
        lookback_days,
        &config.unwrap_or_default(),
    )
}

/// The induction.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Fleet records
    m.add_class::<Trainset>()?;
    m.add_class::<FitnessCertificate>()?;
    m.add_class::<JobCard>()?;

    // Plans and parameters
    m.add_class::<Recommendation>()?;
    m.add_class::<DecisionInput>()?;
    m.add_class::<InductionDecision>()?;
    m.add_class::<PlannedInduction>()?;
    m.add_class::<OptimizationParameter>()?;
    m.add_class::<TuningResult>()?;
    m.add_class::<TuningStats>()?;
    m.add_class::<FleetStats>()?;

    // Alerts
    m.add_class::<Alert>()?;
    m.add_class::<AlertView>()?;

    // Config types
    m.add_class::<EngineConfig>()?;
    m.add_class::<TuningConfig>()?;

    // Engine and pure algorithms
    m.add_class::<PyInductionEngine>()?;
    m.add_function(wrap_pyfunction!(py_score_trainset, m)?)?;
    m.add_function(wrap_pyfunction!(py_compute_tuning, m)?)?;

    Ok(())
}
