//! Fact repository seam and its in-process implementation.
//!
//! The engine only talks to [`FactRepository`]. Any backing store must give
//! two guarantees: `replace_decisions` is atomic with respect to readers of
//! the same date, and `upsert_parameter` never inserts two records for one name.
//! Alert updates are single-record patches and need no cross-record atomicity.

use chrono::{DateTime, NaiveDate, Utc};
use rustc_hash::FxHashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::models::{
    Alert, FitnessCertificate, InductionDecision, JobCard, JobCardStatus, Trainset, TrainsetStatus,
};
use crate::parameters::{OptimizationParameter, ParamValue};

/// Errors reported by a fact repository.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Read and write access to fleet facts, plans, and parameters.
///
/// Enumerations return records in a stable order; ranking ties keep it.
pub trait FactRepository {
    fn trainsets(&self) -> Result<Vec<Trainset>, StoreError>;

    fn trainsets_by_status(&self, status: TrainsetStatus) -> Result<Vec<Trainset>, StoreError>;

    fn certificates_for_trainset(
        &self,
        trainset_id: &str,
    ) -> Result<Vec<FitnessCertificate>, StoreError>;

    fn all_certificates(&self) -> Result<Vec<FitnessCertificate>, StoreError>;

    fn job_cards_for_trainset(&self, trainset_id: &str) -> Result<Vec<JobCard>, StoreError>;

    fn job_cards_by_status(&self, status: JobCardStatus) -> Result<Vec<JobCard>, StoreError>;

    fn all_job_cards(&self) -> Result<Vec<JobCard>, StoreError>;

    fn decisions_for_date(&self, date: NaiveDate) -> Result<Vec<InductionDecision>, StoreError>;

    /// Delete every decision for `date` and insert `decisions` as one atomic step.
    ///
    /// Record ids are assigned by the store; the committed records are returned.
    fn replace_decisions(
        &self,
        date: NaiveDate,
        decisions: Vec<InductionDecision>,
    ) -> Result<Vec<InductionDecision>, StoreError>;

    fn find_parameter(&self, name: &str) -> Result<Option<OptimizationParameter>, StoreError>;

    /// Overwrite the parameter named `name` in place, or insert it if absent.
    fn upsert_parameter(
        &self,
        name: &str,
        value: ParamValue,
        description: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Store a new alert. The store assigns its id and returns the stored record.
    fn insert_alert(&self, alert: Alert) -> Result<Alert, StoreError>;

    /// Alerts with `is_resolved == false`, in creation order.
    fn unresolved_alerts(&self) -> Result<Vec<Alert>, StoreError>;

    fn mark_alert_read(&self, alert_id: u64) -> Result<Alert, StoreError>;

    /// Stamp the alert resolved by `actor` at `at`.
    fn resolve_alert(
        &self,
        alert_id: u64,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    trainsets: Vec<Trainset>,
    trainset_index: FxHashMap<String, usize>,
    certificates: Vec<FitnessCertificate>,
    job_cards: Vec<JobCard>,
    decisions_by_date: FxHashMap<NaiveDate, Vec<InductionDecision>>,
    parameters: Vec<OptimizationParameter>,
    parameter_index: FxHashMap<String, usize>,
    alerts: Vec<Alert>,
    alert_index: FxHashMap<u64, usize>,
    next_id: u64,
}

impl Tables {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_trainset(&self, trainset_id: &str) -> Result<usize, StoreError> {
        self.trainset_index
            .get(trainset_id)
            .copied()
            .ok_or_else(|| StoreError::NotFound {
                kind: "trainset",
                id: trainset_id.to_string(),
            })
    }

    fn alert_mut(&mut self, alert_id: u64) -> Result<&mut Alert, StoreError> {
        let position = self
            .alert_index
            .get(&alert_id)
            .copied()
            .ok_or_else(|| StoreError::NotFound {
                kind: "alert",
                id: alert_id.to_string(),
            })?;
        Ok(&mut self.alerts[position])
    }
}

/// In-memory fact repository guarded by a single reader/writer lock.
///
/// Every write, including the delete-then-insert of a day's plan and the
/// lookup-then-branch of a parameter upsert, runs under the write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    pub fn insert_trainset(&self, trainset: Trainset) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.trainset_index.contains_key(&trainset.id) {
            return Err(StoreError::Conflict(format!(
                "trainset {} already exists",
                trainset.id
            )));
        }
        let position = tables.trainsets.len();
        tables.trainset_index.insert(trainset.id.clone(), position);
        tables.trainsets.push(trainset);
        Ok(())
    }

    pub fn insert_certificate(&self, certificate: FitnessCertificate) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.require_trainset(&certificate.trainset_id)?;
        tables.certificates.push(certificate);
        Ok(())
    }

    pub fn insert_job_card(&self, job_card: JobCard) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.require_trainset(&job_card.trainset_id)?;
        tables.job_cards.push(job_card);
        Ok(())
    }

    /// Move a trainset to a new status and optionally a new location.
    pub fn update_trainset_status(
        &self,
        trainset_id: &str,
        status: TrainsetStatus,
        location: Option<String>,
    ) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let position = tables.require_trainset(trainset_id)?;
        let trainset = &mut tables.trainsets[position];
        trainset.current_status = status;
        if let Some(location) = location {
            trainset.current_location = location;
        }
        Ok(())
    }

    /// Number of stored parameter records (one per name).
    pub fn parameter_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.parameters.len())
    }
}

impl FactRepository for MemoryStore {
    fn trainsets(&self) -> Result<Vec<Trainset>, StoreError> {
        Ok(self.read()?.trainsets.clone())
    }

    fn trainsets_by_status(&self, status: TrainsetStatus) -> Result<Vec<Trainset>, StoreError> {
        Ok(self
            .read()?
            .trainsets
            .iter()
            .filter(|t| t.current_status == status)
            .cloned()
            .collect())
    }

    fn certificates_for_trainset(
        &self,
        trainset_id: &str,
    ) -> Result<Vec<FitnessCertificate>, StoreError> {
        let tables = self.read()?;
        tables.require_trainset(trainset_id)?;
        Ok(tables
            .certificates
            .iter()
            .filter(|c| c.trainset_id == trainset_id)
            .cloned()
            .collect())
    }

    fn all_certificates(&self) -> Result<Vec<FitnessCertificate>, StoreError> {
        Ok(self.read()?.certificates.clone())
    }

    fn job_cards_for_trainset(&self, trainset_id: &str) -> Result<Vec<JobCard>, StoreError> {
        let tables = self.read()?;
        tables.require_trainset(trainset_id)?;
        Ok(tables
            .job_cards
            .iter()
            .filter(|j| j.trainset_id == trainset_id)
            .cloned()
            .collect())
    }

    fn job_cards_by_status(&self, status: JobCardStatus) -> Result<Vec<JobCard>, StoreError> {
        Ok(self
            .read()?
            .job_cards
            .iter()
            .filter(|j| j.status == status)
            .cloned()
            .collect())
    }

    fn all_job_cards(&self) -> Result<Vec<JobCard>, StoreError> {
        Ok(self.read()?.job_cards.clone())
    }

    fn decisions_for_date(&self, date: NaiveDate) -> Result<Vec<InductionDecision>, StoreError> {
        Ok(self
            .read()?
            .decisions_by_date
            .get(&date)
            .cloned()
            .unwrap_or_default())
    }

    fn replace_decisions(
        &self,
        date: NaiveDate,
        decisions: Vec<InductionDecision>,
    ) -> Result<Vec<InductionDecision>, StoreError> {
        let mut tables = self.write()?;
        for decision in &decisions {
            tables.require_trainset(&decision.trainset_id)?;
        }

        tables.decisions_by_date.remove(&date);
        let mut committed = Vec::with_capacity(decisions.len());
        for mut decision in decisions {
            decision.id = tables.allocate_id();
            decision.date = date;
            committed.push(decision);
        }
        tables.decisions_by_date.insert(date, committed.clone());
        Ok(committed)
    }

    fn find_parameter(&self, name: &str) -> Result<Option<OptimizationParameter>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .parameter_index
            .get(name)
            .map(|&position| tables.parameters[position].clone()))
    }

    fn upsert_parameter(
        &self,
        name: &str,
        value: ParamValue,
        description: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut tables = self.write()?;
        let existing_position = tables.parameter_index.get(name).copied();
        if let Some(position) = existing_position {
            let existing = &mut tables.parameters[position];
            existing.value = value;
            existing.description = description.to_string();
            existing.last_updated = at;
            existing.updated_by = actor.to_string();
            return Ok(existing.id);
        }

        let id = tables.allocate_id();
        let position = tables.parameters.len();
        tables.parameters.push(OptimizationParameter {
            id,
            name: name.to_string(),
            value,
            description: description.to_string(),
            last_updated: at,
            updated_by: actor.to_string(),
        });
        tables.parameter_index.insert(name.to_string(), position);
        Ok(id)
    }

    fn insert_alert(&self, mut alert: Alert) -> Result<Alert, StoreError> {
        let mut tables = self.write()?;
        if let Some(trainset_id) = &alert.trainset_id {
            tables.require_trainset(trainset_id)?;
        }
        alert.id = tables.allocate_id();
        let position = tables.alerts.len();
        tables.alert_index.insert(alert.id, position);
        tables.alerts.push(alert.clone());
        Ok(alert)
    }

    fn unresolved_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        Ok(self
            .read()?
            .alerts
            .iter()
            .filter(|a| !a.is_resolved)
            .cloned()
            .collect())
    }

    fn mark_alert_read(&self, alert_id: u64) -> Result<Alert, StoreError> {
        let mut tables = self.write()?;
        let alert = tables.alert_mut(alert_id)?;
        alert.is_read = true;
        Ok(alert.clone())
    }

    fn resolve_alert(
        &self,
        alert_id: u64,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        let mut tables = self.write()?;
        let alert = tables.alert_mut(alert_id)?;
        alert.is_resolved = true;
        alert.resolved_by = Some(actor.to_string());
        alert.resolved_at = Some(at);
        Ok(alert.clone())
    }
}
