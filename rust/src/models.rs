//! Core data types for fleet records and induction plans.

use chrono::{DateTime, NaiveDate, Utc};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Job card priority string that triggers the high-priority penalty (case-sensitive).
pub const HIGH_PRIORITY: &str = "HIGH";

/// A string did not name a known variant of a closed enumeration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

// Closed string enumerations. Python sees them as their lowercase wire strings.
macro_rules! string_enum {
    (
        $(#[$meta:meta])* $name:ident, $kind:literal,
        { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl<'py> FromPyObject<'py> for $name {
            fn extract_bound(ob: &Bound<'py, PyAny>) -> PyResult<Self> {
                let text: String = ob.extract()?;
                text.parse()
                    .map_err(|e: ParseEnumError| PyValueError::new_err(e.to_string()))
            }
        }

        impl IntoPy<PyObject> for $name {
            fn into_py(self, py: Python<'_>) -> PyObject {
                self.as_str().into_py(py)
            }
        }

        impl ToPyObject for $name {
            fn to_object(&self, py: Python<'_>) -> PyObject {
                self.as_str().to_object(py)
            }
        }
    };
}

string_enum!(
    /// Operational status of a trainset.
    TrainsetStatus, "trainset status", {
        Active => "active",
        Standby => "standby",
        Maintenance => "maintenance",
        OutOfService => "out_of_service",
    }
);

string_enum!(
    /// Regulatory clearance category of a fitness certificate.
    CertificateType, "certificate type", {
        RollingStock => "rolling_stock",
        Signalling => "signalling",
        Telecom => "telecom",
    }
);

string_enum!(
    /// Lifecycle status of a maintenance job card.
    JobCardStatus, "job card status", {
        Open => "open",
        InProgress => "in_progress",
        Closed => "closed",
        Cancelled => "cancelled",
    }
);

string_enum!(
    /// Induction outcome for one trainset on one day.
    Decision, "decision", {
        RevenueService => "revenue_service",
        Standby => "standby",
        Maintenance => "maintenance",
    }
);

string_enum!(
    /// What an operational alert is about.
    AlertType, "alert type", {
        FitnessExpiry => "fitness_expiry",
        MaintenanceDue => "maintenance_due",
        BrandingBreach => "branding_breach",
        MileageImbalance => "mileage_imbalance",
        SystemError => "system_error",
    }
);

string_enum!(
    /// Urgency of an alert, lowest first.
    AlertSeverity, "alert severity", {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
);

impl AlertSeverity {
    /// Sort weight; critical is highest.
    pub fn weight(&self) -> u8 {
        match self {
            AlertSeverity::Low => 1,
            AlertSeverity::Medium => 2,
            AlertSeverity::High => 3,
            AlertSeverity::Critical => 4,
        }
    }
}

/// A physical multi-car train unit.
#[pyclass]
#[derive(Clone, Debug)]
pub struct Trainset {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub trainset_number: String,
    #[pyo3(get, set)]
    pub manufacturer: String,
    #[pyo3(get, set)]
    pub year_of_manufacture: i32,
    #[pyo3(get, set)]
    pub total_mileage: f64,
    #[pyo3(get, set)]
    pub current_status: TrainsetStatus,
    #[pyo3(get, set)]
    pub current_location: String,
    #[pyo3(get, set)]
    pub is_active: bool,
}

#[pymethods]
impl Trainset {
    #[new]
    #[pyo3(signature = (
        id,
        trainset_number,
        current_status=TrainsetStatus::Standby,
        manufacturer=String::new(),
        year_of_manufacture=0,
        total_mileage=0.0,
        current_location=String::new(),
        is_active=true
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        trainset_number: String,
        current_status: TrainsetStatus,
        manufacturer: String,
        year_of_manufacture: i32,
        total_mileage: f64,
        current_location: String,
        is_active: bool,
    ) -> Self {
        Self {
            id,
            trainset_number,
            manufacturer,
            year_of_manufacture,
            total_mileage,
            current_status,
            current_location,
            is_active,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Trainset(id={:?}, number={:?}, status={})",
            self.id, self.trainset_number, self.current_status
        )
    }
}

/// A fitness certificate attached to exactly one trainset.
#[pyclass]
#[derive(Clone, Debug)]
pub struct FitnessCertificate {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub trainset_id: String,
    #[pyo3(get, set)]
    pub certificate_type: CertificateType,
    #[pyo3(get, set)]
    pub certificate_number: String,
    #[pyo3(get, set)]
    pub valid_from: DateTime<Utc>,
    #[pyo3(get, set)]
    pub valid_until: DateTime<Utc>,
    #[pyo3(get, set)]
    pub is_active: bool,
}

#[pymethods]
impl FitnessCertificate {
    #[new]
    #[pyo3(signature = (
        id,
        trainset_id,
        certificate_type,
        valid_from,
        valid_until,
        is_active=true,
        certificate_number=String::new()
    ))]
    pub fn new(
        id: String,
        trainset_id: String,
        certificate_type: CertificateType,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
        is_active: bool,
        certificate_number: String,
    ) -> Self {
        Self {
            id,
            trainset_id,
            certificate_type,
            certificate_number,
            valid_from,
            valid_until,
            is_active,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "FitnessCertificate(id={:?}, type={}, valid_until={}, active={})",
            self.id, self.certificate_type, self.valid_until, self.is_active
        )
    }
}

/// A maintenance work order against one trainset.
#[pyclass]
#[derive(Clone, Debug)]
pub struct JobCard {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub trainset_id: String,
    #[pyo3(get, set)]
    pub work_order_id: String,
    #[pyo3(get, set)]
    pub title: String,
    /// Free-form priority; only the exact string "HIGH" is treated as high.
    #[pyo3(get, set)]
    pub priority: String,
    #[pyo3(get, set)]
    pub status: JobCardStatus,
}

#[pymethods]
impl JobCard {
    #[new]
    #[pyo3(signature = (
        id,
        trainset_id,
        priority,
        status,
        work_order_id=String::new(),
        title=String::new()
    ))]
    pub fn new(
        id: String,
        trainset_id: String,
        priority: String,
        status: JobCardStatus,
        work_order_id: String,
        title: String,
    ) -> Self {
        Self {
            id,
            trainset_id,
            work_order_id,
            title,
            priority,
            status,
        }
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority == HIGH_PRIORITY
    }

    fn __repr__(&self) -> String {
        format!(
            "JobCard(id={:?}, trainset_id={:?}, priority={:?}, status={})",
            self.id, self.trainset_id, self.priority, self.status
        )
    }
}

/// A ranked, explainable induction recommendation (computed, not persisted).
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct Recommendation {
    #[pyo3(get)]
    pub trainset_id: String,
    #[pyo3(get)]
    pub trainset_number: String,
    #[pyo3(get)]
    pub decision: Decision,
    #[pyo3(get)]
    pub score: i32,
    /// Dense 1-based rank, 1 = best.
    #[pyo3(get)]
    pub priority: u32,
    #[pyo3(get)]
    pub constraints: Vec<String>,
    #[pyo3(get)]
    pub conflicts: Vec<String>,
    #[pyo3(get)]
    pub reasoning: String,
}

#[pymethods]
impl Recommendation {
    /// Convert into a save payload carrying the same fields.
    pub fn to_decision_input(&self) -> DecisionInput {
        DecisionInput {
            trainset_id: self.trainset_id.clone(),
            decision: self.decision,
            priority: self.priority as i64,
            reasoning: self.reasoning.clone(),
            constraints: self.constraints.clone(),
            conflict_alerts: self.conflicts.clone(),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Recommendation(trainset={:?}, decision={}, score={}, priority={})",
            self.trainset_number, self.decision, self.score, self.priority
        )
    }
}

/// One entry of a plan submitted for saving.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct DecisionInput {
    #[pyo3(get, set)]
    pub trainset_id: String,
    #[pyo3(get, set)]
    pub decision: Decision,
    #[pyo3(get, set)]
    pub priority: i64,
    #[pyo3(get, set)]
    pub reasoning: String,
    #[pyo3(get, set)]
    pub constraints: Vec<String>,
    #[pyo3(get, set)]
    pub conflict_alerts: Vec<String>,
}

#[pymethods]
impl DecisionInput {
    #[new]
    #[pyo3(signature = (
        trainset_id,
        decision,
        priority,
        reasoning,
        constraints=Vec::new(),
        conflict_alerts=Vec::new()
    ))]
    pub fn new(
        trainset_id: String,
        decision: Decision,
        priority: i64,
        reasoning: String,
        constraints: Vec<String>,
        conflict_alerts: Vec<String>,
    ) -> Self {
        Self {
            trainset_id,
            decision,
            priority,
            reasoning,
            constraints,
            conflict_alerts,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "DecisionInput(trainset_id={:?}, decision={}, priority={})",
            self.trainset_id, self.decision, self.priority
        )
    }
}

/// A persisted induction decision, keyed by (date, trainset_id).
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct InductionDecision {
    #[pyo3(get)]
    pub id: u64,
    #[pyo3(get)]
    pub date: NaiveDate,
    #[pyo3(get)]
    pub trainset_id: String,
    #[pyo3(get)]
    pub decision: Decision,
    #[pyo3(get)]
    pub priority: u32,
    #[pyo3(get)]
    pub reasoning: String,
    #[pyo3(get)]
    pub constraints: Vec<String>,
    #[pyo3(get)]
    pub conflict_alerts: Vec<String>,
    #[pyo3(get)]
    pub approved_by: String,
    #[pyo3(get)]
    pub approved_at: DateTime<Utc>,
}

#[pymethods]
impl InductionDecision {
    fn __repr__(&self) -> String {
        format!(
            "InductionDecision(date={}, trainset_id={:?}, decision={}, priority={})",
            self.date, self.trainset_id, self.decision, self.priority
        )
    }
}

/// A saved decision together with the trainset it names.
///
/// `trainset` is `None` when the trainset record is no longer in the store.
#[pyclass]
#[derive(Clone, Debug)]
pub struct PlannedInduction {
    #[pyo3(get)]
    pub decision: InductionDecision,
    #[pyo3(get)]
    pub trainset: Option<Trainset>,
}

#[pymethods]
impl PlannedInduction {
    fn __repr__(&self) -> String {
        format!(
            "PlannedInduction(priority={}, trainset={:?}, decision={})",
            self.decision.priority,
            self.trainset.as_ref().map(|t| t.trainset_number.as_str()),
            self.decision.decision
        )
    }
}

/// An operational alert, optionally about one trainset.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct Alert {
    #[pyo3(get)]
    pub id: u64,
    #[pyo3(get)]
    pub alert_type: AlertType,
    #[pyo3(get)]
    pub severity: AlertSeverity,
    #[pyo3(get)]
    pub title: String,
    #[pyo3(get)]
    pub message: String,
    #[pyo3(get)]
    pub trainset_id: Option<String>,
    #[pyo3(get)]
    pub created_at: DateTime<Utc>,
    #[pyo3(get)]
    pub is_read: bool,
    #[pyo3(get)]
    pub is_resolved: bool,
    #[pyo3(get)]
    pub resolved_by: Option<String>,
    #[pyo3(get)]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[pymethods]
impl Alert {
    fn __repr__(&self) -> String {
        format!(
            "Alert(id={}, type={}, severity={}, title={:?}, resolved={})",
            self.id, self.alert_type, self.severity, self.title, self.is_resolved
        )
    }
}

/// An unresolved alert joined with its trainset, if it names one.
#[pyclass]
#[derive(Clone, Debug)]
pub struct AlertView {
    #[pyo3(get)]
    pub alert: Alert,
    #[pyo3(get)]
    pub trainset: Option<Trainset>,
}

#[pymethods]
impl AlertView {
    fn __repr__(&self) -> String {
        format!(
            "AlertView(severity={}, title={:?}, trainset={:?})",
            self.alert.severity,
            self.alert.title,
            self.trainset.as_ref().map(|t| t.trainset_number.as_str())
        )
    }
}

/// Fleet head-count by operational status.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FleetStats {
    #[pyo3(get)]
    pub total: usize,
    #[pyo3(get)]
    pub active: usize,
    #[pyo3(get)]
    pub standby: usize,
    #[pyo3(get)]
    pub maintenance: usize,
    #[pyo3(get)]
    pub out_of_service: usize,
}

impl FleetStats {
    pub fn from_trainsets(trainsets: &[Trainset]) -> Self {
        let mut stats = Self {
            total: trainsets.len(),
            ..Self::default()
        };
        for trainset in trainsets {
            match trainset.current_status {
                TrainsetStatus::Active => stats.active += 1,
                TrainsetStatus::Standby => stats.standby += 1,
                TrainsetStatus::Maintenance => stats.maintenance += 1,
                TrainsetStatus::OutOfService => stats.out_of_service += 1,
            }
        }
        stats
    }
}

#[pymethods]
impl FleetStats {
    fn __repr__(&self) -> String {
        format!(
            "FleetStats(total={}, active={}, standby={}, maintenance={}, out_of_service={})",
            self.total, self.active, self.standby, self.maintenance, self.out_of_service
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_strings_round_trip_through_from_str() {
        for status in TrainsetStatus::ALL {
            assert_eq!(status.as_str().parse::<TrainsetStatus>(), Ok(*status));
        }
        for decision in Decision::ALL {
            assert_eq!(decision.to_string().parse::<Decision>(), Ok(*decision));
        }
    }

    #[test]
    fn test_unknown_enum_string_is_rejected() {
        let err = "Open".parse::<JobCardStatus>().unwrap_err();
        assert_eq!(err.kind, "job card status");
        assert_eq!(err.to_string(), "unknown job card status: \"Open\"");
        assert!("retired".parse::<TrainsetStatus>().is_err());
    }

    #[test]
    fn test_alert_enums_use_wire_strings() {
        assert_eq!("fitness_expiry".parse::<AlertType>(), Ok(AlertType::FitnessExpiry));
        assert_eq!(AlertType::MileageImbalance.as_str(), "mileage_imbalance");
        assert!("urgent".parse::<AlertSeverity>().is_err());
        let weights: Vec<u8> = AlertSeverity::ALL.iter().map(|s| s.weight()).collect();
        assert_eq!(weights, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_high_priority_is_case_sensitive() {
        let mut card = JobCard::new(
            "j1".to_string(),
            "t1".to_string(),
            "HIGH".to_string(),
            JobCardStatus::Open,
            String::new(),
            String::new(),
        );
        assert!(card.is_high_priority());
        card.priority = "high".to_string();
        assert!(!card.is_high_priority());
    }

    #[test]
    fn test_fleet_stats_counts_each_status() {
        let make = |id: &str, status| {
            Trainset::new(
                id.to_string(),
                id.to_uppercase(),
                status,
                String::new(),
                2019,
                0.0,
                String::new(),
                true,
            )
        };
        let fleet = vec![
            make("a", TrainsetStatus::Active),
            make("b", TrainsetStatus::Active),
            make("c", TrainsetStatus::Standby),
            make("d", TrainsetStatus::OutOfService),
        ];
        let stats = FleetStats::from_trainsets(&fleet);
        assert_eq!(
            stats,
            FleetStats {
                total: 4,
                active: 2,
                standby: 1,
                maintenance: 0,
                out_of_service: 1,
            }
        );
    }
}
