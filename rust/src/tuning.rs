//! Auto-tuning of scoring penalties from current fleet aggregates.
//!
//! Unlike recommendation generation, which treats every non-closed job card
//! as open, the tuner counts only cards whose status is exactly `open`.

use chrono::{DateTime, Duration, Utc};
use pyo3::prelude::*;
use rustc_hash::FxHashSet;

use crate::config::TuningConfig;
use crate::engine::EngineError;
use crate::models::{FitnessCertificate, JobCard, JobCardStatus};
use crate::parameters::{
    upsert_parameter, ParamValue, PENALTY_EXPIRING_CERTIFICATE, PENALTY_HIGH_PRIORITY_JOBS,
};
use crate::store::FactRepository;
use crate::{log_debug, log_decisions};

const TUNED_HIGH_PRIORITY_DESCRIPTION: &str =
    "Auto-tuned penalty from recent open HIGH priority job cards";
const TUNED_EXPIRING_DESCRIPTION: &str = "Auto-tuned penalty from imminent certificate expirations";

/// Raw counters behind a tuning run.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TuningStats {
    /// Echoed back; the formulas do not use it.
    #[pyo3(get)]
    pub lookback_days: u32,
    #[pyo3(get)]
    pub open_job_cards: usize,
    #[pyo3(get)]
    pub high_priority_jobs: usize,
    #[pyo3(get)]
    pub expiring_soon_certificates: usize,
    #[pyo3(get)]
    pub total_certificates: usize,
    /// Distinct trainsets with an open job card, floored at 1.
    #[pyo3(get)]
    pub active_trainsets_count: usize,
}

#[pymethods]
impl TuningStats {
    fn __repr__(&self) -> String {
        format!(
            "TuningStats(open_job_cards={}, high_priority_jobs={}, \
             expiring_soon_certificates={}, active_trainsets_count={})",
            self.open_job_cards,
            self.high_priority_jobs,
            self.expiring_soon_certificates,
            self.active_trainsets_count
        )
    }
}

/// New penalty values plus the counters they were derived from.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TuningResult {
    #[pyo3(get)]
    pub penalty_high_priority_jobs: i32,
    #[pyo3(get)]
    pub penalty_expiring_certificate: i32,
    #[pyo3(get)]
    pub stats: TuningStats,
}

#[pymethods]
impl TuningResult {
    fn __repr__(&self) -> String {
        format!(
            "TuningResult(penalty_high_priority_jobs={}, penalty_expiring_certificate={})",
            self.penalty_high_priority_jobs, self.penalty_expiring_certificate
        )
    }
}

fn capped_round(value: f64, cap: f64) -> i32 {
    value.round().min(cap) as i32
}

/// `now` plus `hours`, saturating at the representable range.
fn expiry_horizon(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    Duration::try_hours(hours)
        .and_then(|span| now.checked_add_signed(span))
        .unwrap_or(if hours < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

/// Derive both penalties from job cards and certificates as of `now`.
///
/// Both divisors are floored at 1, so an empty fleet yields the base penalties.
pub fn compute_tuning(
    job_cards: &[JobCard],
    certificates: &[FitnessCertificate],
    now: DateTime<Utc>,
    lookback_days: u32,
    config: &TuningConfig,
) -> TuningResult {
    let open: Vec<&JobCard> = job_cards
        .iter()
        .filter(|j| j.status == JobCardStatus::Open)
        .collect();
    let high_priority_jobs = open.iter().filter(|j| j.is_high_priority()).count();

    let distinct_trainsets: FxHashSet<&str> =
        open.iter().map(|j| j.trainset_id.as_str()).collect();
    let active_trainsets_count = distinct_trainsets.len().max(1);
    let avg_high_jobs_per_trainset = high_priority_jobs as f64 / active_trainsets_count as f64;

    let horizon = expiry_horizon(now, config.expiry_horizon_hours);
    let expiring_soon_certificates = certificates
        .iter()
        .filter(|c| c.is_active && c.valid_until <= horizon)
        .count();
    let expiring_ratio = expiring_soon_certificates as f64 / certificates.len().max(1) as f64;

    TuningResult {
        penalty_high_priority_jobs: capped_round(
            config.high_priority_base + avg_high_jobs_per_trainset * config.high_priority_per_job,
            config.penalty_cap,
        ),
        penalty_expiring_certificate: capped_round(
            config.expiring_base + expiring_ratio * config.expiring_scale,
            config.penalty_cap,
        ),
        stats: TuningStats {
            lookback_days,
            open_job_cards: open.len(),
            high_priority_jobs,
            expiring_soon_certificates,
            total_certificates: certificates.len(),
            active_trainsets_count,
        },
    }
}

/// Recompute both penalties from the repository and write them back.
pub fn train_from_history<R: FactRepository + ?Sized>(
    repo: &R,
    lookback_days: u32,
    actor: &str,
    now: DateTime<Utc>,
    config: &TuningConfig,
    verbosity: u8,
) -> Result<TuningResult, EngineError> {
    let open_job_cards = repo.job_cards_by_status(JobCardStatus::Open)?;
    let certificates = repo.all_certificates()?;
    let result = compute_tuning(&open_job_cards, &certificates, now, lookback_days, config);

    log_debug!(verbosity, "Tuning stats: {:?}", result.stats);
    log_decisions!(
        verbosity,
        "Tuned penalties: high_priority_jobs={}, expiring_certificate={}",
        result.penalty_high_priority_jobs,
        result.penalty_expiring_certificate
    );

    upsert_parameter(
        repo,
        PENALTY_HIGH_PRIORITY_JOBS,
        ParamValue::Number(result.penalty_high_priority_jobs as f64),
        TUNED_HIGH_PRIORITY_DESCRIPTION,
        actor,
        now,
        verbosity,
    )?;
    upsert_parameter(
        repo,
        PENALTY_EXPIRING_CERTIFICATE,
        ParamValue::Number(result.penalty_expiring_certificate as f64),
        TUNED_EXPIRING_DESCRIPTION,
        actor,
        now,
        verbosity,
    )?;

    Ok(result)
}
