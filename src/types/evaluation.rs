//! Rule Evaluator stage output types (spec §3, §4.6)

use serde::{Deserialize, Serialize};

/// The five soft-scoring dimension weights (spec §4.6). Must sum to 1.0
/// within `1e-6`; enforced by [`EvaluationWeights::validate`] wherever a
/// weight record is loaded (config default, per-disaster-type override, or
/// per-request override).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct EvaluationWeights {
    pub success_rate: f64,
    pub response_time: f64,
    pub coverage_rate: f64,
    pub risk: f64,
    pub redundancy: f64,
}

impl EvaluationWeights {
    /// Default weights per spec §4.6's table.
    pub const fn defaults() -> Self {
        Self {
            success_rate: 0.35,
            response_time: 0.30,
            coverage_rate: 0.20,
            risk: 0.05,
            redundancy: 0.10,
        }
    }

    /// `sum(weights) == 1.0 ± 1e-6` (spec §8 invariant).
    pub fn validate(&self) -> Result<(), crate::types::PipelineError> {
        let sum = self.success_rate + self.response_time + self.coverage_rate + self.risk + self.redundancy;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(crate::types::PipelineError::ConfigError(format!(
                "evaluation weights sum to {sum}, expected 1.0"
            )));
        }
        Ok(())
    }
}

impl Default for EvaluationWeights {
    fn default() -> Self {
        Self::defaults()
    }
}

/// The five normalized per-solution dimension scores (spec §4.6 table).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SoftScores {
    pub success_rate: f64,
    pub response_time: f64,
    pub coverage_rate: f64,
    pub risk: f64,
    pub redundancy: f64,
}

impl SoftScores {
    pub fn weighted_sum(&self, weights: &EvaluationWeights) -> f64 {
        self.success_rate * weights.success_rate
            + self.response_time * weights.response_time
            + self.coverage_rate * weights.coverage_rate
            + self.risk * weights.risk
            + self.redundancy * weights.redundancy
    }
}

/// The reinforcement tier advised in catastrophe mode (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReinforcementLevel {
    Municipal,
    Provincial,
    National,
}

/// The evaluated, ranked scoring record for one allocation solution
/// (spec §3 "SchemeScore").
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemeScore {
    pub scheme_id: String,
    pub hard_rule_passed: bool,
    pub hard_rule_violations: Vec<String>,
    pub soft_rule_scores: SoftScores,
    pub weighted_score: f64,
    pub rank: u32,
    pub catastrophe_mode: bool,
    /// `estimated_trapped − total rescue capacity`, populated only in
    /// catastrophe mode (SPEC_FULL.md §3 addition).
    pub capacity_gap: Option<i64>,
    pub reinforcement_level: Option<ReinforcementLevel>,
    /// `true` when this scheme is the catastrophe-mode recommendation and an
    /// operator reinforcement call is advised (spec §8 "All solutions
    /// violate hard rules" boundary behavior).
    pub requires_reinforcement: bool,
    /// Human-readable advisory naming the capacity gap, non-empty whenever
    /// `requires_reinforcement` is set (spec §8 `reinforcement_message`,
    /// spec §4.6 `capacity_warning`).
    pub capacity_warning: String,
}
