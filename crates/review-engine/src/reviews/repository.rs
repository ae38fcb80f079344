use serde::{Deserialize, Serialize};

use super::audit::AuditRecord;
use super::domain::{
    ChallengeId, ChallengeSnapshot, Resource, Review, ReviewId, ScorecardId, ScorecardTree,
    Submission, SubmissionId,
};
use super::query::ReviewQuery;

/// Storage abstraction for review records so the service can be exercised
/// against in-memory fakes.
pub trait ReviewRepository: Send + Sync {
    /// Allocate the identifier the next inserted review will carry.
    /// Implementations derive it from their own storage, so a process
    /// restart cannot reissue an id that is already taken.
    fn allocate_id(&self) -> Result<ReviewId, RepositoryError>;
    fn insert(&self, review: Review) -> Result<Review, RepositoryError>;
    fn update(&self, review: Review) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError>;
    fn delete(&self, id: &ReviewId) -> Result<(), RepositoryError>;
    fn list(&self, query: &ReviewQuery) -> Result<Vec<Review>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Read-only scorecard catalog owned by an external service.
pub trait ScorecardCatalog: Send + Sync {
    fn scorecard_tree(&self, id: &ScorecardId) -> Result<Option<ScorecardTree>, DirectoryError>;
}

/// Read-only challenge directory.
pub trait ChallengeDirectory: Send + Sync {
    fn challenge(&self, id: &ChallengeId) -> Result<Option<ChallengeSnapshot>, DirectoryError>;
    fn challenges(&self, ids: &[ChallengeId]) -> Result<Vec<ChallengeSnapshot>, DirectoryError>;
}

/// Read-only resource (role assignment) directory.
pub trait ResourceDirectory: Send + Sync {
    fn member_resources(
        &self,
        challenge_id: &ChallengeId,
        member_id: &str,
    ) -> Result<Vec<Resource>, DirectoryError>;
}

/// Read-only submission store.
pub trait SubmissionStore: Send + Sync {
    fn submission(&self, id: &SubmissionId) -> Result<Option<Submission>, DirectoryError>;
    fn member_submissions(
        &self,
        challenge_id: &ChallengeId,
        member_id: &str,
    ) -> Result<Vec<Submission>, DirectoryError>;
    /// Whether the member has at least one submission with a passing
    /// summation on a review-type scorecard for the challenge.
    fn has_passing_submission(
        &self,
        challenge_id: &ChallengeId,
        member_id: &str,
    ) -> Result<bool, DirectoryError>;
}

/// Failure reaching an external directory or catalog.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Event emitted exactly once when a review transitions to COMPLETED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub topic: String,
    pub review_id: ReviewId,
    pub challenge_id: ChallengeId,
    pub submission_id: Option<SubmissionId>,
    pub final_score: Option<f64>,
}

impl ReviewEvent {
    pub const COMPLETED_TOPIC: &'static str = "review.action.completed";

    pub fn completed(review: &Review) -> Self {
        Self {
            topic: Self::COMPLETED_TOPIC.to_string(),
            review_id: review.id.clone(),
            challenge_id: review.challenge_id.clone(),
            submission_id: review.submission_id.clone(),
            final_score: review.final_score,
        }
    }
}

/// Outbound event hook (bus adapter supplied by the host service).
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: ReviewEvent) -> Result<(), PublishError>;
}

/// Event dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

/// Append-only sink for audit entries.
pub trait AuditStore: Send + Sync {
    fn append(&self, record: AuditRecord) -> Result<(), AuditSinkError>;
}

/// Audit persistence error.
#[derive(Debug, thiserror::Error)]
pub enum AuditSinkError {
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
}
