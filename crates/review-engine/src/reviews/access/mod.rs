mod policy;
mod rules;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{
    Actor, ChallengeSnapshot, ResolvedRole, Resource, ResourceId, Review, RoleKind, SubmissionId,
};
use super::patch::{ReviewItemDraft, ReviewItemPatch, ReviewPatch};
use crate::config::PhaseConfig;

/// Requested operation, carrying the relevant payload so scope rules can
/// inspect exactly what would change.
#[derive(Debug)]
pub enum ReviewAction<'a> {
    ListReviews,
    ReadReview,
    CreateReview { resource_id: &'a ResourceId },
    UpdateReview(&'a ReviewPatch),
    CreateItem(&'a ReviewItemDraft),
    UpdateItem(&'a ReviewItemPatch),
    ReplaceItems(&'a [ReviewItemDraft]),
    DeleteItem,
    DeleteReview,
}

/// How much of a readable record must be stripped before it leaves the
/// system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskScope {
    /// Record existence is visible but its content is not yet.
    Full,
    /// Content is visible but the derived scores are withheld.
    ScoresOnly,
}

/// Outcome of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow {
        /// Set when a privileged score edit must carry a manager comment.
        requires_manager_comment: bool,
    },
    AllowWithMask(MaskScope),
    Deny(DenialReason),
}

impl Decision {
    pub const fn allow() -> Self {
        Decision::Allow {
            requires_manager_comment: false,
        }
    }

    pub const fn is_allowed(&self) -> bool {
        !matches!(self, Decision::Deny(_))
    }
}

/// Stable machine-readable denial reasons surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DenialReason {
    #[error("actor does not own the review")]
    NotOwner,
    #[error("copilot item edits are limited to the final answer")]
    CopilotScope,
    #[error("a manager comment is required when changing a score")]
    ManagerCommentRequired,
    #[error("resourceId, phaseId, and submissionId are immutable")]
    ImmutableFields,
    #[error("resource phase does not match a review-capable challenge phase")]
    ResourcePhaseMismatch,
    #[error("the relevant phase or challenge is closed to this edit")]
    PhaseClosed,
    #[error("review is not visible to this actor")]
    ForbiddenReviewAccess,
    #[error("review is not visible until its phase closes")]
    ForbiddenReviewAccessPhase,
    #[error("ownership cannot be verified")]
    OwnershipUnverified,
}

impl DenialReason {
    pub const fn code(self) -> &'static str {
        match self {
            DenialReason::NotOwner => "NOT_OWNER",
            DenialReason::CopilotScope => "COPILOT_SCOPE",
            DenialReason::ManagerCommentRequired => "MANAGER_COMMENT_REQUIRED",
            DenialReason::ImmutableFields => "IMMUTABLE_FIELDS",
            DenialReason::ResourcePhaseMismatch => "RESOURCE_PHASE_MISMATCH",
            DenialReason::PhaseClosed => "PHASE_CLOSED",
            DenialReason::ForbiddenReviewAccess => "FORBIDDEN_REVIEW_ACCESS",
            DenialReason::ForbiddenReviewAccessPhase => "FORBIDDEN_REVIEW_ACCESS_PHASE",
            DenialReason::OwnershipUnverified => "OWNERSHIP_UNVERIFIED",
        }
    }
}

/// Everything the decision function needs, resolved once per request by the
/// service so the function itself stays pure.
#[derive(Debug)]
pub struct AccessFacts<'a> {
    pub actor: &'a Actor,
    pub roles: &'a [ResolvedRole],
    pub challenge: &'a ChallengeSnapshot,
    pub review: Option<&'a Review>,
    pub own_submission_ids: &'a BTreeSet<SubmissionId>,
    pub has_passing_submission: bool,
    pub phases: &'a PhaseConfig,
}

impl<'a> AccessFacts<'a> {
    pub fn has_role(&self, kind: RoleKind) -> bool {
        self.roles.iter().any(|role| role.kind == kind)
    }

    pub fn has_reviewer_class_role(&self) -> bool {
        self.roles.iter().any(|role| role.kind.is_reviewer_class())
    }

    pub fn owned_resource(&self, resource_id: &ResourceId) -> Option<&Resource> {
        self.roles
            .iter()
            .map(|role| &role.resource)
            .find(|resource| &resource.id == resource_id)
    }

    pub fn owns_review(&self, review: &Review) -> bool {
        self.owned_resource(&review.resource_id).is_some()
    }

    pub fn owns_submission_of(&self, review: &Review) -> bool {
        review
            .submission_id
            .as_ref()
            .map(|id| self.own_submission_ids.contains(id))
            .unwrap_or(false)
    }
}

/// Decide whether the actor may perform the action. Machine actors and
/// admins bypass everything except the immutable-field rule and the
/// manager-comment requirement on admin score edits.
pub fn decide(facts: &AccessFacts<'_>, action: &ReviewAction<'_>) -> Decision {
    if let ReviewAction::UpdateReview(patch) = action {
        if patch.touches_immutable() {
            return Decision::Deny(DenialReason::ImmutableFields);
        }
    }

    if facts.actor.is_privileged() {
        if facts.actor.is_admin {
            if let ReviewAction::UpdateItem(patch) = action {
                if patch.changes_score() {
                    if !patch.has_manager_comment() {
                        return Decision::Deny(DenialReason::ManagerCommentRequired);
                    }
                    return Decision::Allow {
                        requires_manager_comment: true,
                    };
                }
            }
        }
        return Decision::allow();
    }

    match action {
        ReviewAction::ListReviews | ReviewAction::ReadReview => policy::decide_read(facts, action),
        ReviewAction::CreateReview { resource_id } => rules::decide_create(facts, resource_id),
        ReviewAction::UpdateReview(patch) => rules::decide_update(facts, patch),
        ReviewAction::CreateItem(_) | ReviewAction::ReplaceItems(_) | ReviewAction::DeleteItem => {
            rules::decide_item_structural(facts)
        }
        ReviewAction::UpdateItem(patch) => rules::decide_item_update(facts, patch),
        ReviewAction::DeleteReview => rules::decide_delete_review(facts),
    }
}
