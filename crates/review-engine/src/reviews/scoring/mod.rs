mod recompute;
mod rules;

pub use recompute::{RecomputeError, RecomputeOutcome, ScoreRecomputeCoordinator};

use serde::{Deserialize, Serialize};

use super::domain::{ReviewItem, ScorecardTree};
use rules::{aggregate_chain, round2, ScoreChain};

/// Derived scores for both answer chains, each in [0,100] rounded to two
/// decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePair {
    pub initial_score: f64,
    pub final_score: f64,
}

/// Pure aggregation of a scorecard tree plus the current item set. Questions
/// without an item score zero but keep their weight share; the final chain
/// falls back to initial answers.
pub fn aggregate(tree: &ScorecardTree, items: &[ReviewItem]) -> ScorePair {
    ScorePair {
        initial_score: round2(aggregate_chain(tree, items, ScoreChain::Initial)),
        final_score: round2(aggregate_chain(tree, items, ScoreChain::Final)),
    }
}
