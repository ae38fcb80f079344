use std::sync::Arc;

use tracing::{debug, warn};

use super::super::domain::{ReviewId, ScorecardId};
use super::super::repository::{
    DirectoryError, RepositoryError, ReviewRepository, ScorecardCatalog,
};
use super::{aggregate, ScorePair};

/// Re-derives a review's scores from its current item set and persists them
/// only when they differ from the stored values.
///
/// Scoring is a derived, recoverable value: callers invoke
/// [`ScoreRecomputeCoordinator::recompute_best_effort`] after item mutations
/// and a failure never blocks the mutation that triggered it. Concurrent
/// item mutations on the same review race last-write-wins on the aggregate;
/// recompute is idempotent, so the next mutation heals a lost update.
pub struct ScoreRecomputeCoordinator {
    repository: Arc<dyn ReviewRepository>,
    scorecards: Arc<dyn ScorecardCatalog>,
}

/// Result of a successful recompute pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecomputeOutcome {
    /// Stored scores already match the aggregate; no write was issued.
    Unchanged,
    Updated(ScorePair),
}

/// Recoverable failures of a recompute pass, distinct from hard service
/// failures so callers can log-and-continue.
#[derive(Debug, thiserror::Error)]
pub enum RecomputeError {
    #[error("review no longer exists")]
    ReviewMissing(ReviewId),
    #[error("scorecard cannot be resolved")]
    ScorecardMissing(ScorecardId),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ScoreRecomputeCoordinator {
    pub fn new(
        repository: Arc<dyn ReviewRepository>,
        scorecards: Arc<dyn ScorecardCatalog>,
    ) -> Self {
        Self {
            repository,
            scorecards,
        }
    }

    pub fn recompute(&self, review_id: &ReviewId) -> Result<RecomputeOutcome, RecomputeError> {
        let review = self
            .repository
            .fetch(review_id)?
            .ok_or_else(|| RecomputeError::ReviewMissing(review_id.clone()))?;

        let tree = self
            .scorecards
            .scorecard_tree(&review.scorecard_id)?
            .ok_or_else(|| RecomputeError::ScorecardMissing(review.scorecard_id.clone()))?;

        let pair = aggregate(&tree, &review.review_items);
        if review.initial_score == Some(pair.initial_score)
            && review.final_score == Some(pair.final_score)
        {
            return Ok(RecomputeOutcome::Unchanged);
        }

        let mut updated = review;
        updated.initial_score = Some(pair.initial_score);
        updated.final_score = Some(pair.final_score);
        self.repository.update(updated)?;

        Ok(RecomputeOutcome::Updated(pair))
    }

    /// Fail-open wrapper used on mutation paths.
    pub fn recompute_best_effort(&self, review_id: &ReviewId) {
        match self.recompute(review_id) {
            Ok(RecomputeOutcome::Updated(pair)) => {
                debug!(
                    review_id = %review_id.0,
                    initial_score = pair.initial_score,
                    final_score = pair.final_score,
                    "review scores recomputed"
                );
            }
            Ok(RecomputeOutcome::Unchanged) => {}
            Err(error) => {
                warn!(review_id = %review_id.0, %error, "score recompute skipped");
            }
        }
    }
}
