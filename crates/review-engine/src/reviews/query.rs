use serde::{Deserialize, Serialize};

use super::domain::{
    ChallengeId, PhaseId, ResourceId, Review, ReviewStatus, ScorecardId, SubmissionId,
};

/// Typed predicate set for listing reviews. Each supported filter is a named
/// field so the combinations are enumerable and testable without storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewQuery {
    #[serde(default)]
    pub challenge_id: Option<ChallengeId>,
    #[serde(default)]
    pub submission_id: Option<SubmissionId>,
    #[serde(default)]
    pub resource_id: Option<ResourceId>,
    #[serde(default)]
    pub phase_id: Option<PhaseId>,
    #[serde(default)]
    pub scorecard_id: Option<ScorecardId>,
    #[serde(default)]
    pub status: Option<ReviewStatus>,
    #[serde(default)]
    pub committed: Option<bool>,
}

impl ReviewQuery {
    pub fn for_challenge(challenge_id: ChallengeId) -> Self {
        Self {
            challenge_id: Some(challenge_id),
            ..Self::default()
        }
    }

    pub fn with_submission(mut self, submission_id: SubmissionId) -> Self {
        self.submission_id = Some(submission_id);
        self
    }

    pub fn with_resource(mut self, resource_id: ResourceId) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    pub fn with_phase(mut self, phase_id: PhaseId) -> Self {
        self.phase_id = Some(phase_id);
        self
    }

    pub fn with_scorecard(mut self, scorecard_id: ScorecardId) -> Self {
        self.scorecard_id = Some(scorecard_id);
        self
    }

    pub fn with_status(mut self, status: ReviewStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_committed(mut self, committed: bool) -> Self {
        self.committed = Some(committed);
        self
    }

    /// Evaluate the conjunction of all present filters against one review.
    pub fn matches(&self, review: &Review) -> bool {
        if let Some(challenge_id) = &self.challenge_id {
            if &review.challenge_id != challenge_id {
                return false;
            }
        }
        if let Some(submission_id) = &self.submission_id {
            if review.submission_id.as_ref() != Some(submission_id) {
                return false;
            }
        }
        if let Some(resource_id) = &self.resource_id {
            if &review.resource_id != resource_id {
                return false;
            }
        }
        if let Some(phase_id) = &self.phase_id {
            if &review.phase_id != phase_id {
                return false;
            }
        }
        if let Some(scorecard_id) = &self.scorecard_id {
            if &review.scorecard_id != scorecard_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if review.status != status {
                return false;
            }
        }
        if let Some(committed) = self.committed {
            if review.committed != committed {
                return false;
            }
        }
        true
    }
}
