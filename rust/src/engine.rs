//! Induction engine: the operations exposed to callers.
//!
//! The engine trusts the actor identity it is given; role checks belong to
//! the caller. Every operation runs synchronously and does not retry.

use chrono::{DateTime, NaiveDate, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::alerts::{self, NewAlert};
use crate::config::{EngineConfig, TuningConfig};
use crate::models::{
    Alert, AlertView, DecisionInput, FleetStats, InductionDecision, JobCardStatus,
    PlannedInduction, Recommendation, Trainset, TrainsetStatus,
};
use crate::parameters::{self, ScoringParams};
use crate::ranking::{rank, ScoredTrainset};
use crate::scoring::score_trainset;
use crate::store::{FactRepository, StoreError};
use crate::tuning::{self, TuningResult};
use crate::{log_checks, log_decisions};

/// Errors surfaced by engine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => EngineError::NotFound { kind, id },
            StoreError::Unauthorized(msg) => EngineError::Unauthorized(msg),
            other => EngineError::Store(other.to_string()),
        }
    }
}

/// Parse an ISO-8601 calendar date (`YYYY-MM-DD`).
pub fn parse_date(date: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| EngineError::Validation(format!("invalid date {:?}: {}", date, e)))
}

/// Treat a missing sub-record lookup for one trainset as an empty list.
fn tolerate_missing<T>(
    result: Result<Vec<T>, StoreError>,
    trainset: &Trainset,
    verbosity: u8,
) -> Result<Vec<T>, StoreError> {
    match result {
        Err(StoreError::NotFound { kind, id }) => {
            log_checks!(
                verbosity,
                "{} ({}): {} lookup found nothing for {}, scoring as empty",
                trainset.trainset_number,
                trainset.id,
                kind,
                id
            );
            Ok(Vec::new())
        }
        other => other,
    }
}

/// Scoring, ranking, persistence, and tuning over one fact repository.
pub struct InductionEngine<R: FactRepository> {
    repo: R,
    config: EngineConfig,
    tuning: TuningConfig,
}

impl<R: FactRepository> InductionEngine<R> {
    pub fn new(repo: R, config: EngineConfig, tuning: TuningConfig) -> Self {
        Self {
            repo,
            config,
            tuning,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Score and rank every `active` trainset for `date`. Nothing is persisted.
    ///
    /// A trainset whose certificates or job cards cannot be found is scored as
    /// if it had none; other store failures abort the run.
    pub fn generate_recommendations(
        &self,
        date: &str,
    ) -> Result<Vec<Recommendation>, EngineError> {
        let as_of = parse_date(date)?;
        let params = ScoringParams::resolve(&self.repo)?;
        let verbosity = self.config.verbosity;
        log_decisions!(
            verbosity,
            "Generating recommendations for {} (expiring={}, high_priority={})",
            as_of,
            params.penalty_expiring_certificate,
            params.penalty_high_priority_jobs
        );

        let trainsets = self.repo.trainsets_by_status(TrainsetStatus::Active)?;
        let mut scored = Vec::with_capacity(trainsets.len());
        for trainset in trainsets {
            let certificates = tolerate_missing(
                self.repo.certificates_for_trainset(&trainset.id),
                &trainset,
                verbosity,
            )?;
            let open_job_cards: Vec<_> = tolerate_missing(
                self.repo.job_cards_for_trainset(&trainset.id),
                &trainset,
                verbosity,
            )?
            .into_iter()
            .filter(|j| j.status != JobCardStatus::Closed)
            .collect();
            log_checks!(
                verbosity,
                "{}: {} certificates, {} non-closed job cards",
                trainset.trainset_number,
                certificates.len(),
                open_job_cards.len()
            );

            let result =
                score_trainset(&certificates, &open_job_cards, as_of, &params, &self.config);
            scored.push(ScoredTrainset {
                trainset_id: trainset.id,
                trainset_number: trainset.trainset_number,
                result,
            });
        }

        Ok(rank(scored, &self.config))
    }

    /// Replace the plan for `date` with `decisions`, stamped with `actor` and now.
    pub fn save_decisions(
        &self,
        date: &str,
        decisions: &[DecisionInput],
        actor: &str,
    ) -> Result<Vec<InductionDecision>, EngineError> {
        self.save_decisions_at(date, decisions, actor, Utc::now())
    }

    /// [`save_decisions`](Self::save_decisions) with an explicit commit time.
    ///
    /// The whole payload is validated before anything is written; one bad
    /// entry rejects the save and leaves the previous plan in place.
    pub fn save_decisions_at(
        &self,
        date: &str,
        decisions: &[DecisionInput],
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<InductionDecision>, EngineError> {
        let date = parse_date(date)?;
        let records = validate_decisions(date, decisions, actor, now)?;
        let committed = self.repo.replace_decisions(date, records)?;
        log_decisions!(
            self.config.verbosity,
            "Committed {} decisions for {} by {}",
            committed.len(),
            date,
            actor
        );
        Ok(committed)
    }

    /// The saved plan for `date`, best priority first, each joined with its trainset.
    ///
    /// A decision whose trainset has since been removed carries `trainset: None`.
    pub fn decisions_for_date(&self, date: &str) -> Result<Vec<PlannedInduction>, EngineError> {
        let date = parse_date(date)?;
        let mut decisions = self.repo.decisions_for_date(date)?;
        decisions.sort_by_key(|d| d.priority);

        let trainsets: FxHashMap<String, Trainset> = self
            .repo
            .trainsets()?
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();
        Ok(decisions
            .into_iter()
            .map(|decision| PlannedInduction {
                trainset: trainsets.get(&decision.trainset_id).cloned(),
                decision,
            })
            .collect())
    }

    /// Write both penalties at their defaults (50, 30), overwriting any tuned values.
    pub fn seed_default_parameters(&self, actor: &str) -> Result<(), EngineError> {
        self.seed_default_parameters_at(actor, Utc::now())
    }

    pub fn seed_default_parameters_at(
        &self,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        parameters::seed_default_parameters(&self.repo, actor, now, self.config.verbosity)
    }

    /// Re-derive both penalties from current aggregates and store them.
    ///
    /// `lookback_days` defaults to the configured window and is echoed in the
    /// stats; it does not affect the computed values.
    pub fn train_from_history(
        &self,
        lookback_days: Option<u32>,
        actor: &str,
    ) -> Result<TuningResult, EngineError> {
        self.train_from_history_at(lookback_days, actor, Utc::now())
    }

    pub fn train_from_history_at(
        &self,
        lookback_days: Option<u32>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<TuningResult, EngineError> {
        let lookback_days = lookback_days.unwrap_or(self.config.default_lookback_days);
        tuning::train_from_history(
            &self.repo,
            lookback_days,
            actor,
            now,
            &self.tuning,
            self.config.verbosity,
        )
    }

    pub fn fleet_stats(&self) -> Result<FleetStats, EngineError> {
        Ok(FleetStats::from_trainsets(&self.repo.trainsets()?))
    }

    /// Raise a new alert stamped with the current time.
    pub fn create_alert(&self, alert: NewAlert) -> Result<Alert, EngineError> {
        self.create_alert_at(alert, Utc::now())
    }

    pub fn create_alert_at(
        &self,
        alert: NewAlert,
        now: DateTime<Utc>,
    ) -> Result<Alert, EngineError> {
        alerts::create_alert(&self.repo, alert, now, self.config.verbosity)
    }

    /// Unresolved alerts, critical first, each joined with its trainset.
    pub fn active_alerts(&self) -> Result<Vec<AlertView>, EngineError> {
        alerts::active_alerts(&self.repo, self.config.verbosity)
    }

    pub fn mark_alert_read(&self, alert_id: u64) -> Result<Alert, EngineError> {
        alerts::mark_read(&self.repo, alert_id, self.config.verbosity)
    }

    pub fn resolve_alert(&self, alert_id: u64, actor: &str) -> Result<Alert, EngineError> {
        self.resolve_alert_at(alert_id, actor, Utc::now())
    }

    pub fn resolve_alert_at(
        &self,
        alert_id: u64,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Alert, EngineError> {
        alerts::resolve(&self.repo, alert_id, actor, now, self.config.verbosity)
    }
}

fn validate_decisions(
    date: NaiveDate,
    decisions: &[DecisionInput],
    actor: &str,
    now: DateTime<Utc>,
) -> Result<Vec<InductionDecision>, EngineError> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut records = Vec::with_capacity(decisions.len());

    for (index, input) in decisions.iter().enumerate() {
        if input.trainset_id.trim().is_empty() {
            return Err(EngineError::Validation(format!(
                "decision {} is missing trainset_id",
                index
            )));
        }
        if !seen.insert(input.trainset_id.as_str()) {
            return Err(EngineError::Validation(format!(
                "trainset {} appears more than once",
                input.trainset_id
            )));
        }
        let priority = u32::try_from(input.priority)
            .ok()
            .filter(|&p| p >= 1)
            .ok_or_else(|| {
                EngineError::Validation(format!(
                    "decision for {} has invalid priority {}",
                    input.trainset_id, input.priority
                ))
            })?;

        records.push(InductionDecision {
            id: 0,
            date,
            trainset_id: input.trainset_id.clone(),
            decision: input.decision,
            priority,
            reasoning: input.reasoning.clone(),
            constraints: input.constraints.clone(),
            conflict_alerts: input.conflict_alerts.clone(),
            approved_by: actor.to_string(),
            approved_at: now,
        });
    }

    Ok(records)
}
