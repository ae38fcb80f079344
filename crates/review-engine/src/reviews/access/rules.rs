//! Mutation-side access rules for member actors; the machine/admin bypass
//! lives in [`super::decide`].

use super::super::domain::{ChallengeStatus, ResourceId, ReviewStatus, RoleKind};
use super::super::patch::{ReviewItemPatch, ReviewPatch};
use super::{AccessFacts, Decision, DenialReason};

/// A member may create a review only under a reviewer resource they own,
/// and only while that resource's phase is a review-capable phase that is
/// currently open.
pub(super) fn decide_create(facts: &AccessFacts<'_>, resource_id: &ResourceId) -> Decision {
    let owned = facts.roles.iter().find(|role| {
        role.kind.is_reviewer_class() && &role.resource.id == resource_id
    });
    let Some(role) = owned else {
        return Decision::Deny(DenialReason::NotOwner);
    };

    let phase = role
        .resource
        .phase_id
        .as_ref()
        .and_then(|phase_id| facts.challenge.phase(phase_id));
    let Some(phase) = phase else {
        return Decision::Deny(DenialReason::ResourcePhaseMismatch);
    };
    if !facts.phases.is_review_capable(&phase.name) {
        return Decision::Deny(DenialReason::ResourcePhaseMismatch);
    }
    if !phase.is_open {
        return Decision::Deny(DenialReason::PhaseClosed);
    }

    Decision::allow()
}

pub(super) fn decide_update(facts: &AccessFacts<'_>, patch: &ReviewPatch) -> Decision {
    let Some(review) = facts.review else {
        return Decision::Deny(DenialReason::ForbiddenReviewAccess);
    };

    if facts.owns_review(review) {
        if facts.challenge.status == ChallengeStatus::Completed {
            return Decision::Deny(DenialReason::PhaseClosed);
        }
        // A completed review is closed to its owner; reopening is a
        // copilot/admin operation.
        if review.status == ReviewStatus::Completed {
            return Decision::Deny(DenialReason::PhaseClosed);
        }
        return Decision::allow();
    }

    if facts.has_role(RoleKind::Copilot) && (patch.is_reopen(review) || patch.is_status_only()) {
        return Decision::allow();
    }

    Decision::Deny(DenialReason::NotOwner)
}

/// Item creation, deletion, and whole-set replacement are owner-only
/// operations among members.
pub(super) fn decide_item_structural(facts: &AccessFacts<'_>) -> Decision {
    let Some(review) = facts.review else {
        return Decision::Deny(DenialReason::ForbiddenReviewAccess);
    };

    if facts.owns_review(review) {
        return owner_edit_gate(facts, review.status);
    }
    if facts.has_role(RoleKind::Copilot) {
        return Decision::Deny(DenialReason::CopilotScope);
    }
    Decision::Deny(DenialReason::NotOwner)
}

pub(super) fn decide_item_update(facts: &AccessFacts<'_>, patch: &ReviewItemPatch) -> Decision {
    let Some(review) = facts.review else {
        return Decision::Deny(DenialReason::ForbiddenReviewAccess);
    };

    if facts.owns_review(review) {
        return owner_edit_gate(facts, review.status);
    }

    if facts.has_role(RoleKind::Copilot) {
        // The manager comment only rides along with a score override; a
        // comment-only or empty patch is outside the copilot's scope.
        if patch.exceeds_score_scope() || !patch.changes_score() {
            return Decision::Deny(DenialReason::CopilotScope);
        }
        if !patch.has_manager_comment() {
            return Decision::Deny(DenialReason::ManagerCommentRequired);
        }
        return Decision::Allow {
            requires_manager_comment: true,
        };
    }

    Decision::Deny(DenialReason::NotOwner)
}

pub(super) fn decide_delete_review(facts: &AccessFacts<'_>) -> Decision {
    if facts.has_role(RoleKind::Copilot) {
        return Decision::allow();
    }
    Decision::Deny(DenialReason::NotOwner)
}

fn owner_edit_gate(facts: &AccessFacts<'_>, review_status: ReviewStatus) -> Decision {
    if facts.challenge.status == ChallengeStatus::Completed
        || review_status == ReviewStatus::Completed
    {
        return Decision::Deny(DenialReason::PhaseClosed);
    }
    Decision::allow()
}
