//! Operational alerts: raising, listing by urgency, and closing them out.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use std::cmp::Reverse;

use crate::engine::EngineError;
use crate::models::{Alert, AlertSeverity, AlertType, AlertView};
use crate::store::FactRepository;
use crate::{log_checks, log_decisions};

/// Fields supplied by whoever raises an alert.
#[derive(Clone, Debug)]
pub struct NewAlert {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub trainset_id: Option<String>,
}

/// Store a new unread, unresolved alert created at `now`.
pub fn create_alert<R: FactRepository + ?Sized>(
    repo: &R,
    new: NewAlert,
    now: DateTime<Utc>,
    verbosity: u8,
) -> Result<Alert, EngineError> {
    if new.title.trim().is_empty() {
        return Err(EngineError::Validation(
            "alert title must not be empty".to_string(),
        ));
    }
    let stored = repo.insert_alert(Alert {
        id: 0,
        alert_type: new.alert_type,
        severity: new.severity,
        title: new.title,
        message: new.message,
        trainset_id: new.trainset_id,
        created_at: now,
        is_read: false,
        is_resolved: false,
        resolved_by: None,
        resolved_at: None,
    })?;
    log_decisions!(
        verbosity,
        "Alert {} raised: [{}] {} {}",
        stored.id,
        stored.severity,
        stored.alert_type,
        stored.title
    );
    Ok(stored)
}

/// Every unresolved alert, most severe first.
///
/// Alerts of equal severity stay in creation order. An alert whose trainset
/// has since left the store is returned with `trainset: None`.
pub fn active_alerts<R: FactRepository + ?Sized>(
    repo: &R,
    verbosity: u8,
) -> Result<Vec<AlertView>, EngineError> {
    let mut alerts = repo.unresolved_alerts()?;
    alerts.sort_by_key(|a| Reverse(a.severity.weight()));

    let trainsets: FxHashMap<String, _> = repo
        .trainsets()?
        .into_iter()
        .map(|t| (t.id.clone(), t))
        .collect();

    Ok(alerts
        .into_iter()
        .map(|alert| {
            let trainset = alert
                .trainset_id
                .as_ref()
                .and_then(|id| trainsets.get(id).cloned());
            if let (Some(id), None) = (&alert.trainset_id, &trainset) {
                log_checks!(verbosity, "Alert {} names missing trainset {}", alert.id, id);
            }
            AlertView { alert, trainset }
        })
        .collect())
}

pub fn mark_read<R: FactRepository + ?Sized>(
    repo: &R,
    alert_id: u64,
    verbosity: u8,
) -> Result<Alert, EngineError> {
    let alert = repo.mark_alert_read(alert_id)?;
    log_checks!(verbosity, "Alert {} marked read", alert_id);
    Ok(alert)
}

/// Close an alert, recording who resolved it and when.
///
/// Resolving twice overwrites the earlier stamp.
pub fn resolve<R: FactRepository + ?Sized>(
    repo: &R,
    alert_id: u64,
    actor: &str,
    now: DateTime<Utc>,
    verbosity: u8,
) -> Result<Alert, EngineError> {
    let alert = repo.resolve_alert(alert_id, actor, now)?;
    log_decisions!(verbosity, "Alert {} resolved by {}", alert_id, actor);
    Ok(alert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Trainset, TrainsetStatus};
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 7, 30, 0).unwrap()
    }

    fn store_with_trainset() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_trainset(Trainset::new(
                "t1".to_string(),
                "KM-001".to_string(),
                TrainsetStatus::Active,
                "Alstom".to_string(),
                2018,
                0.0,
                "Muttom Depot".to_string(),
                true,
            ))
            .unwrap();
        store
    }

    fn raise(
        store: &MemoryStore,
        severity: AlertSeverity,
        title: &str,
        trainset_id: Option<&str>,
    ) -> Alert {
        create_alert(
            store,
            NewAlert {
                alert_type: AlertType::FitnessExpiry,
                severity,
                title: title.to_string(),
                message: String::new(),
                trainset_id: trainset_id.map(str::to_string),
            },
            now(),
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_created_alert_is_unread_and_open() {
        let store = store_with_trainset();
        let alert = raise(&store, AlertSeverity::High, "Telecom certificate lapsing", Some("t1"));
        assert!(alert.id > 0);
        assert!(!alert.is_read);
        assert!(!alert.is_resolved);
        assert_eq!(alert.created_at, now());
        assert_eq!(alert.resolved_by, None);
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let store = store_with_trainset();
        let result = create_alert(
            &store,
            NewAlert {
                alert_type: AlertType::SystemError,
                severity: AlertSeverity::Low,
                title: "   ".to_string(),
                message: "ignored".to_string(),
                trainset_id: None,
            },
            now(),
            0,
        );
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_active_alerts_sorted_by_severity_then_creation() {
        let store = store_with_trainset();
        raise(&store, AlertSeverity::Low, "low-1", None);
        raise(&store, AlertSeverity::Critical, "critical-1", Some("t1"));
        raise(&store, AlertSeverity::Medium, "medium-1", None);
        raise(&store, AlertSeverity::Critical, "critical-2", None);
        raise(&store, AlertSeverity::High, "high-1", None);

        let titles: Vec<String> = active_alerts(&store, 0)
            .unwrap()
            .into_iter()
            .map(|v| v.alert.title)
            .collect();
        assert_eq!(titles, vec!["critical-1", "critical-2", "high-1", "medium-1", "low-1"]);
    }

    #[test]
    fn test_active_alerts_join_their_trainset() {
        let store = store_with_trainset();
        raise(&store, AlertSeverity::High, "with trainset", Some("t1"));
        raise(&store, AlertSeverity::Medium, "fleet wide", None);

        let views = active_alerts(&store, 0).unwrap();
        let number = views[0].trainset.as_ref().map(|t| t.trainset_number.as_str());
        assert_eq!(number, Some("KM-001"));
        assert!(views[1].trainset.is_none());
    }

    #[test]
    fn test_mark_read_keeps_alert_active() {
        let store = store_with_trainset();
        let alert = raise(&store, AlertSeverity::Medium, "Brake wear", Some("t1"));
        let updated = mark_read(&store, alert.id, 0).unwrap();
        assert!(updated.is_read);

        let views = active_alerts(&store, 0).unwrap();
        assert_eq!(views.len(), 1);
        assert!(views[0].alert.is_read);
    }

    #[test]
    fn test_resolve_stamps_actor_and_time_and_hides_alert() {
        let store = store_with_trainset();
        let keep = raise(&store, AlertSeverity::Low, "Mileage drift", None);
        let close = raise(&store, AlertSeverity::Critical, "Signalling fault", Some("t1"));
        let later = now() + Duration::hours(2);

        let resolved = resolve(&store, close.id, "supervisor-3", later, 0).unwrap();
        assert!(resolved.is_resolved);
        assert_eq!(resolved.resolved_by.as_deref(), Some("supervisor-3"));
        assert_eq!(resolved.resolved_at, Some(later));

        let ids: Vec<u64> = active_alerts(&store, 0)
            .unwrap()
            .iter()
            .map(|v| v.alert.id)
            .collect();
        assert_eq!(ids, vec![keep.id]);
    }

    #[test]
    fn test_unknown_alert_id_is_not_found() {
        let store = store_with_trainset();
        assert!(matches!(
            mark_read(&store, 999, 0),
            Err(EngineError::NotFound { kind: "alert", .. })
        ));
        assert!(matches!(
            resolve(&store, 999, "admin", now(), 0),
            Err(EngineError::NotFound { kind: "alert", .. })
        ));
    }
}
