//! Per-trainset induction scoring.
//!
//! Scoring is a pure function of the facts and the penalties passed in; the
//! parameter store is resolved by the caller before a run starts.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

use crate::config::EngineConfig;
use crate::models::{FitnessCertificate, JobCard};
use crate::parameters::ScoringParams;
use crate::{log_checks, log_debug};

/// Score and explanation for one trainset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrainsetScore {
    /// Not floored; many expiring certificates can drive it negative.
    pub score: i32,
    /// Certificate messages in input order, then at most one job card message.
    pub constraints: Vec<String>,
}

/// Midnight (UTC) at the start of the day after `as_of`.
pub fn expiry_cutoff(as_of: NaiveDate) -> DateTime<Utc> {
    let tomorrow = as_of.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    tomorrow.and_time(NaiveTime::MIN).and_utc()
}

/// Score one trainset for the decision date `as_of`.
///
/// `open_job_cards` is the caller's non-closed set; only exact `"HIGH"`
/// priorities are penalized, and only once however many there are.
/// Inactive certificates are ignored. A missing certificate type is not penalized.
pub fn score_trainset(
    certificates: &[FitnessCertificate],
    open_job_cards: &[JobCard],
    as_of: NaiveDate,
    params: &ScoringParams,
    config: &EngineConfig,
) -> TrainsetScore {
    let verbosity = config.verbosity;
    let cutoff = expiry_cutoff(as_of);
    let mut score = config.base_score;
    let mut constraints = Vec::new();

    for cert in certificates.iter().filter(|c| c.is_active) {
        if cert.valid_until < cutoff {
            log_checks!(
                verbosity,
                "Certificate {} ({}) valid until {} < cutoff {}",
                cert.id,
                cert.certificate_type,
                cert.valid_until,
                cutoff
            );
            score = score.saturating_sub(params.penalty_expiring_certificate);
            constraints.push(format!("{} certificate expires soon", cert.certificate_type));
        }
    }

    let high_priority = open_job_cards.iter().filter(|j| j.is_high_priority()).count();
    if high_priority > 0 {
        log_checks!(verbosity, "{} high priority job cards open", high_priority);
        score = score.saturating_sub(params.penalty_high_priority_jobs);
        constraints.push(format!("{} high priority job cards open", high_priority));
    }

    log_debug!(
        verbosity,
        "Scored with {} certificates, {} open job cards: {}",
        certificates.len(),
        open_job_cards.len(),
        score
    );

    TrainsetScore { score, constraints }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CertificateType, JobCardStatus};
    use chrono::{Duration, TimeZone};

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn cert(
        id: &str,
        kind: CertificateType,
        valid_until: DateTime<Utc>,
        active: bool,
    ) -> FitnessCertificate {
        FitnessCertificate {
            id: id.to_string(),
            trainset_id: "t1".to_string(),
            certificate_type: kind,
            certificate_number: String::new(),
            valid_from: valid_until - Duration::days(90),
            valid_until,
            is_active: active,
        }
    }

    fn job(id: &str, priority: &str) -> JobCard {
        JobCard {
            id: id.to_string(),
            trainset_id: "t1".to_string(),
            work_order_id: format!("WO-{}", id),
            title: "Bogie Inspection".to_string(),
            priority: priority.to_string(),
            status: JobCardStatus::Open,
        }
    }

    fn score(certs: &[FitnessCertificate], jobs: &[JobCard]) -> TrainsetScore {
        score_trainset(
            certs,
            jobs,
            d(2025, 3, 10),
            &ScoringParams::default(),
            &EngineConfig::default(),
        )
    }

    #[test]
    fn test_cutoff_is_next_midnight() {
        assert_eq!(
            expiry_cutoff(d(2025, 12, 31)),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_clean_trainset_keeps_base_score() {
        let far = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let result = score(&[cert("c1", CertificateType::Telecom, far, true)], &[job("j1", "LOW")]);
        assert_eq!(result.score, 100);
        assert!(result.constraints.is_empty());
    }

    #[test]
    fn test_single_expiring_certificate() {
        // Cutoff is 2025-03-11T00:00Z; two days before it
        let expiring = Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap();
        let result = score(&[cert("c1", CertificateType::RollingStock, expiring, true)], &[]);
        assert_eq!(result.score, 50);
        assert_eq!(result.constraints, vec!["rolling_stock certificate expires soon"]);
    }

    #[test]
    fn test_cutoff_boundary_is_exclusive() {
        let at_cutoff = Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap();
        let just_before = at_cutoff - Duration::milliseconds(1);
        let result = score(
            &[
                cert("c1", CertificateType::Signalling, at_cutoff, true),
                cert("c2", CertificateType::Telecom, just_before, true),
            ],
            &[],
        );
        assert_eq!(result.score, 50);
        assert_eq!(result.constraints, vec!["telecom certificate expires soon"]);
    }

    #[test]
    fn test_each_expiring_certificate_is_penalized_and_score_goes_negative() {
        let expired = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let certs = vec![
            cert("c1", CertificateType::Signalling, expired, true),
            cert("c2", CertificateType::RollingStock, expired, true),
            cert("c3", CertificateType::Signalling, expired, true),
        ];
        let result = score(&certs, &[job("j1", "HIGH")]);
        assert_eq!(result.score, 100 - 150 - 30);
        assert_eq!(
            result.constraints,
            vec![
                "signalling certificate expires soon",
                "rolling_stock certificate expires soon",
                "signalling certificate expires soon",
                "1 high priority job cards open",
            ]
        );
    }

    #[test]
    fn test_inactive_certificate_is_ignored() {
        let expired = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let result = score(&[cert("c1", CertificateType::Telecom, expired, false)], &[]);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_high_priority_jobs_penalized_once() {
        let jobs = vec![job("j1", "HIGH"), job("j2", "MEDIUM"), job("j3", "HIGH")];
        let result = score(&[], &jobs);
        assert_eq!(result.score, 70);
        assert_eq!(result.constraints, vec!["2 high priority job cards open"]);
    }

    #[test]
    fn test_lowercase_high_is_not_high_priority() {
        let result = score(&[], &[job("j1", "high"), job("j2", "High")]);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_custom_penalties_are_used() {
        let expiring = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let params = ScoringParams {
            penalty_expiring_certificate: 52,
            penalty_high_priority_jobs: 28,
        };
        let result = score_trainset(
            &[cert("c1", CertificateType::Telecom, expiring, true)],
            &[job("j1", "HIGH")],
            d(2025, 3, 10),
            &params,
            &EngineConfig::default(),
        );
        assert_eq!(result.score, 20);
    }

    #[test]
    fn test_repeated_scoring_is_identical() {
        let expired = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let certs = vec![
            cert("c1", CertificateType::Telecom, expired, true),
            cert("c2", CertificateType::RollingStock, expired, true),
        ];
        let jobs = vec![job("j1", "HIGH")];
        let first = score(&certs, &jobs);
        for _ in 0..10 {
            assert_eq!(score(&certs, &jobs), first);
        }
    }
}
