use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{
    ChallengeId, ItemComment, PhaseId, QuestionId, ResourceId, Review, ReviewStatus, ScorecardId,
    SubmissionId,
};

/// Payload for creating a review. Scores are always derived and therefore
/// absent here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub challenge_id: ChallengeId,
    pub resource_id: ResourceId,
    pub submission_id: Option<SubmissionId>,
    pub scorecard_id: ScorecardId,
    pub phase_id: PhaseId,
    #[serde(default)]
    pub type_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub submitter_handle: Option<String>,
    #[serde(default)]
    pub submitter_max_rating: Option<i32>,
}

/// Named-field patch for a review. `resource_id`, `phase_id`, and
/// `submission_id` are present only so attempts to modify them can be
/// rejected explicitly; they are immutable after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewPatch {
    #[serde(default)]
    pub status: Option<ReviewStatus>,
    #[serde(default)]
    pub committed: Option<bool>,
    #[serde(default)]
    pub type_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub review_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resource_id: Option<ResourceId>,
    #[serde(default)]
    pub phase_id: Option<PhaseId>,
    #[serde(default)]
    pub submission_id: Option<SubmissionId>,
}

impl ReviewPatch {
    pub fn status(status: ReviewStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn touches_immutable(&self) -> bool {
        self.resource_id.is_some() || self.phase_id.is_some() || self.submission_id.is_some()
    }

    /// True when the patch changes nothing beyond `status`.
    pub fn is_status_only(&self) -> bool {
        self.status.is_some()
            && self.committed.is_none()
            && self.type_id.is_none()
            && self.metadata.is_none()
            && self.review_date.is_none()
            && !self.touches_immutable()
    }

    /// A reopen moves a completed review back to an open state without
    /// asserting `committed`.
    pub fn is_reopen(&self, review: &Review) -> bool {
        review.status == ReviewStatus::Completed
            && matches!(
                self.status,
                Some(ReviewStatus::Pending) | Some(ReviewStatus::InProgress)
            )
            && self.committed != Some(true)
            && self.type_id.is_none()
            && self.metadata.is_none()
            && self.review_date.is_none()
            && !self.touches_immutable()
    }
}

/// Payload for creating a single review item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItemDraft {
    pub scorecard_question_id: QuestionId,
    pub initial_answer: String,
    #[serde(default)]
    pub final_answer: Option<String>,
    #[serde(default)]
    pub manager_comment: Option<String>,
    #[serde(default)]
    pub comments: Vec<ItemComment>,
}

/// Named-field patch for a review item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewItemPatch {
    #[serde(default)]
    pub initial_answer: Option<String>,
    #[serde(default)]
    pub final_answer: Option<String>,
    #[serde(default)]
    pub manager_comment: Option<String>,
    #[serde(default)]
    pub scorecard_question_id: Option<QuestionId>,
    #[serde(default)]
    pub comments: Option<Vec<ItemComment>>,
}

impl ReviewItemPatch {
    pub fn final_answer(answer: impl Into<String>) -> Self {
        Self {
            final_answer: Some(answer.into()),
            ..Self::default()
        }
    }

    pub fn changes_score(&self) -> bool {
        self.final_answer.is_some()
    }

    /// Fields a copilot may not touch: everything except the final answer
    /// and the manager comment that justifies it.
    pub fn exceeds_score_scope(&self) -> bool {
        self.initial_answer.is_some()
            || self.scorecard_question_id.is_some()
            || self.comments.is_some()
    }

    pub fn has_manager_comment(&self) -> bool {
        self.manager_comment
            .as_deref()
            .map(|comment| !comment.trim().is_empty())
            .unwrap_or(false)
    }
}
