use serde::{Deserialize, Serialize};

/// Policy applied when a ballot closes with equal yes and no counts.
/// `Reject` preserves the status quo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TiePolicy {
    #[default]
    Reject,
    Accept,
}

/// Tunables for the optimizer and the reallocation machinery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverConfig {
    // Soft constraint weights
    pub student_satisfaction_weight: f64,
    pub faculty_workload_weight: f64,
    pub room_utilization_weight: f64,
    pub curriculum_flexibility_weight: f64,

    /// Wall-clock budget for one solver run, in seconds.
    pub solver_time_budget: f64,
    /// Hours a ballot stays open after it is announced.
    pub voting_deadline_hours: i64,
    pub majority_tie_policy: TiePolicy,
    /// Retry bound for optimistic assignment updates.
    pub max_conflict_retries: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            student_satisfaction_weight: 1.0,
            faculty_workload_weight: 0.8,
            room_utilization_weight: 0.6,
            curriculum_flexibility_weight: 0.9,
            solver_time_budget: 300.0,
            voting_deadline_hours: 24,
            majority_tie_policy: TiePolicy::Reject,
            max_conflict_retries: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = SolverConfig::default();
        assert_eq!(cfg.majority_tie_policy, TiePolicy::Reject);
        assert!(cfg.solver_time_budget > 0.0);
        assert!(cfg.voting_deadline_hours > 0);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: SolverConfig =
            serde_json::from_str(r#"{"solverTimeBudget": 5.0}"#).unwrap();
        assert_eq!(cfg.solver_time_budget, 5.0);
        assert_eq!(cfg.voting_deadline_hours, 24);
    }
}
