use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier wrapper for reviews.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewId(pub String);

/// Identifier wrapper for scorecard questions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(pub String);

/// Identifier wrapper for submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

/// Identifier wrapper for challenge-scoped resources (role assignments).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub String);

/// Identifier wrapper for challenges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChallengeId(pub String);

/// Identifier wrapper for challenge phases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhaseId(pub String);

/// Identifier wrapper for scorecards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScorecardId(pub String);

/// Answer semantics attached to a scorecard question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    YesNo,
    Scale,
    TestCase,
    Other,
}

/// Leaf of the scorecard hierarchy; weights are relative to sibling questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardQuestion {
    pub id: QuestionId,
    pub weight: f64,
    pub kind: QuestionKind,
    pub scale_min: Option<f64>,
    pub scale_max: Option<f64>,
}

/// Mid-level grouping of questions with its own sibling-relative weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardSection {
    pub weight: f64,
    pub questions: Vec<ScorecardQuestion>,
}

/// Top-level grouping of sections with its own sibling-relative weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardGroup {
    pub weight: f64,
    pub sections: Vec<ScorecardSection>,
}

/// Read-only weighted hierarchy a review is evaluated against. Immutable per
/// review; owned by the external scorecard catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardTree {
    pub scorecard_id: ScorecardId,
    pub groups: Vec<ScorecardGroup>,
}

impl ScorecardTree {
    pub fn contains_question(&self, id: &QuestionId) -> bool {
        self.groups
            .iter()
            .flat_map(|group| group.sections.iter())
            .flat_map(|section| section.questions.iter())
            .any(|question| &question.id == id)
    }
}

/// Free-form commentary attached to a review item by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemComment {
    pub author_member_id: String,
    pub content: String,
}

/// Per-question answer belonging to exactly one review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub scorecard_question_id: QuestionId,
    pub initial_answer: String,
    /// Defaults to `initial_answer` for scoring when absent.
    pub final_answer: Option<String>,
    pub manager_comment: Option<String>,
    pub comments: Vec<ItemComment>,
}

/// Appeal raised by a submitter against a single review item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appeal {
    pub id: String,
    pub scorecard_question_id: QuestionId,
    pub content: String,
}

/// High level review lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    Pending,
    InProgress,
    Completed,
}

impl ReviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::InProgress => "in_progress",
            ReviewStatus::Completed => "completed",
        }
    }

    pub const fn is_open(self) -> bool {
        matches!(self, ReviewStatus::Pending | ReviewStatus::InProgress)
    }
}

/// A reviewer's scored evaluation of a submission (or of the challenge itself
/// for submission-less review types). Scores are derived, never user-supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub challenge_id: ChallengeId,
    pub resource_id: ResourceId,
    pub submission_id: Option<SubmissionId>,
    pub scorecard_id: ScorecardId,
    pub phase_id: PhaseId,
    pub type_id: Option<String>,
    pub status: ReviewStatus,
    pub committed: bool,
    pub initial_score: Option<f64>,
    pub final_score: Option<f64>,
    pub review_date: Option<DateTime<Utc>>,
    pub metadata: Option<Value>,
    pub submitter_handle: Option<String>,
    pub submitter_max_rating: Option<i32>,
    pub review_items: Vec<ReviewItem>,
    pub appeals: Vec<Appeal>,
}

impl Review {
    pub fn item(&self, question_id: &QuestionId) -> Option<&ReviewItem> {
        self.review_items
            .iter()
            .find(|item| &item.scorecard_question_id == question_id)
    }
}

/// Challenge lifecycle states as reported by the challenge directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl ChallengeStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, ChallengeStatus::Completed | ChallengeStatus::Cancelled)
    }
}

/// Challenge families whose submission/review cadence widens visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeKind {
    Standard,
    MarathonMatch,
    First2Finish,
}

impl ChallengeKind {
    pub const fn broadened_visibility(self) -> bool {
        matches!(self, ChallengeKind::MarathonMatch | ChallengeKind::First2Finish)
    }
}

/// A named, time-bounded stage of a challenge with open/closed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    pub id: PhaseId,
    pub name: String,
    pub is_open: bool,
    pub actual_end_time: Option<DateTime<Utc>>,
}

impl PhaseSnapshot {
    /// A phase whose window has actually elapsed, as opposed to one that was
    /// never scheduled or never started.
    pub fn has_closed(&self) -> bool {
        !self.is_open && self.actual_end_time.is_some()
    }
}

/// Read-only view of a challenge fetched from the external directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeSnapshot {
    pub id: ChallengeId,
    pub status: ChallengeStatus,
    pub kind: ChallengeKind,
    pub phases: Vec<PhaseSnapshot>,
}

impl ChallengeSnapshot {
    pub fn phase(&self, id: &PhaseId) -> Option<&PhaseSnapshot> {
        self.phases.iter().find(|phase| &phase.id == id)
    }
}

/// The requesting principal, before challenge-scoped role resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub member_id: Option<String>,
    pub is_machine: bool,
    pub is_admin: bool,
}

impl Actor {
    pub fn member(member_id: impl Into<String>) -> Self {
        Self {
            member_id: Some(member_id.into()),
            is_machine: false,
            is_admin: false,
        }
    }

    pub fn machine() -> Self {
        Self {
            member_id: None,
            is_machine: true,
            is_admin: false,
        }
    }

    pub fn admin(member_id: impl Into<String>) -> Self {
        Self {
            member_id: Some(member_id.into()),
            is_machine: false,
            is_admin: true,
        }
    }

    pub const fn is_privileged(&self) -> bool {
        self.is_machine || self.is_admin
    }

    /// Identity recorded on audit entries; machines audit under a fixed tag.
    pub fn audit_handle(&self) -> Option<String> {
        if self.is_machine {
            return Some("machine".to_string());
        }
        self.member_id.clone()
    }
}

/// Challenge-scoped role assignment from the resource directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub challenge_id: ChallengeId,
    pub member_id: String,
    pub role_name: String,
    pub phase_id: Option<PhaseId>,
}

/// Closed enumeration of role kinds the access rules reason about, resolved
/// once per request from resource records instead of ad-hoc string matching
/// at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleKind {
    Reviewer,
    IterativeReviewer,
    CheckpointReviewer,
    Screener,
    CheckpointScreener,
    Copilot,
    Submitter,
    Approver,
    Observer,
    Other,
}

impl RoleKind {
    /// Roles that author or screen reviews and share the reviewer read tier.
    pub const fn is_reviewer_class(self) -> bool {
        matches!(
            self,
            RoleKind::Reviewer
                | RoleKind::IterativeReviewer
                | RoleKind::CheckpointReviewer
                | RoleKind::Screener
                | RoleKind::CheckpointScreener
                | RoleKind::Approver
        )
    }

    /// Roles that may see screening-phase reviews once assigned.
    pub const fn sees_screening_reviews(self) -> bool {
        matches!(
            self,
            RoleKind::Reviewer
                | RoleKind::CheckpointReviewer
                | RoleKind::Screener
                | RoleKind::CheckpointScreener
        )
    }
}

/// Map a directory role name onto the closed [`RoleKind`] catalog.
pub fn classify_role(role_name: &str) -> RoleKind {
    match role_name.trim().to_ascii_lowercase().as_str() {
        "reviewer" => RoleKind::Reviewer,
        "iterative reviewer" => RoleKind::IterativeReviewer,
        "checkpoint reviewer" => RoleKind::CheckpointReviewer,
        "screener" | "primary screener" => RoleKind::Screener,
        "checkpoint screener" => RoleKind::CheckpointScreener,
        "copilot" => RoleKind::Copilot,
        "submitter" => RoleKind::Submitter,
        "approver" => RoleKind::Approver,
        "observer" => RoleKind::Observer,
        _ => RoleKind::Other,
    }
}

/// A role resolved for the requesting member on a specific challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRole {
    pub kind: RoleKind,
    pub resource: Resource,
}

impl ResolvedRole {
    pub fn from_resource(resource: Resource) -> Self {
        Self {
            kind: classify_role(&resource.role_name),
            resource,
        }
    }
}

/// Submission record as exposed by the external submission store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub challenge_id: ChallengeId,
    pub member_id: String,
}
