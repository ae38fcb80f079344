//! Review scoring aggregation and phase-gated access control.
//!
//! The submodules compose into one pipeline: the access engine authorizes
//! an operation, the service applies it, the recompute coordinator
//! re-derives the review's scores, and the audit recorder captures
//! privileged changes. Reads run through the same decision function and the
//! visibility masker before a record leaves the system.

pub mod access;
pub mod audit;
pub mod domain;
pub mod masking;
pub mod patch;
pub mod query;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use access::{decide, AccessFacts, Decision, DenialReason, MaskScope, ReviewAction};
pub use audit::{diff_review, AuditDiffRecorder, AuditRecord};
pub use domain::{
    classify_role, Actor, Appeal, ChallengeId, ChallengeKind, ChallengeSnapshot, ChallengeStatus,
    ItemComment, PhaseId, PhaseSnapshot, QuestionId, QuestionKind, ResolvedRole, Resource,
    ResourceId, Review, ReviewId, ReviewItem, ReviewStatus, RoleKind, ScorecardGroup, ScorecardId,
    ScorecardQuestion, ScorecardSection, ScorecardTree, Submission, SubmissionId,
};
pub use masking::mask_review;
pub use patch::{ReviewDraft, ReviewItemDraft, ReviewItemPatch, ReviewPatch};
pub use query::ReviewQuery;
pub use repository::{
    AuditSinkError, AuditStore, ChallengeDirectory, DirectoryError, EventPublisher, PublishError,
    RepositoryError, ResourceDirectory, ReviewEvent, ReviewRepository, ScorecardCatalog,
    SubmissionStore,
};
pub use router::review_router;
pub use scoring::{
    aggregate, RecomputeError, RecomputeOutcome, ScorePair, ScoreRecomputeCoordinator,
};
pub use service::{EntityKind, ReviewService, ReviewServiceError, ValidationError};
