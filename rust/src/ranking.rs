//! Decision thresholds and ranking of scored trainsets.
//!
//! Ranking is a stable sort on score, highest first. Trainsets with equal
//! scores keep the order in which they were enumerated; there is no secondary key.

use crate::config::EngineConfig;
use crate::log_decisions;
use crate::models::{Decision, Recommendation};
use crate::scoring::TrainsetScore;

/// A trainset together with its computed score, before ranking.
#[derive(Clone, Debug)]
pub struct ScoredTrainset {
    pub trainset_id: String,
    pub trainset_number: String,
    pub result: TrainsetScore,
}

/// Map a score to a decision. First match wins:
/// below `maintenance_below` is maintenance, below `revenue_service_from` is standby.
pub fn classify(score: i32, config: &EngineConfig) -> Decision {
    if score < config.maintenance_below {
        Decision::Maintenance
    } else if score < config.revenue_service_from {
        Decision::Standby
    } else {
        Decision::RevenueService
    }
}

/// `"Score: {score}/100. {constraints joined by '. '}"`.
///
/// With no constraints the string ends in `"100. "` with nothing after it.
pub fn format_reasoning(score: i32, constraints: &[String]) -> String {
    format!("Score: {}/100. {}", score, constraints.join(". "))
}

/// Order scored trainsets best-first and assign dense priorities `1..=N`.
pub fn rank(mut scored: Vec<ScoredTrainset>, config: &EngineConfig) -> Vec<Recommendation> {
    scored.sort_by(|a, b| b.result.score.cmp(&a.result.score));

    scored
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let score = entry.result.score;
            let decision = classify(score, config);
            let priority = index as u32 + 1;
            log_decisions!(
                config.verbosity,
                "#{} {} -> {} (score {})",
                priority,
                entry.trainset_number,
                decision,
                score
            );
            Recommendation {
                reasoning: format_reasoning(score, &entry.result.constraints),
                trainset_id: entry.trainset_id,
                trainset_number: entry.trainset_number,
                decision,
                score,
                priority,
                constraints: entry.result.constraints,
                conflicts: Vec::new(),
            }
        })
        .collect()
}
