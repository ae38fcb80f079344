//! Read-side visibility policy. Every branch is a named special case of one
//! decision function rather than a separate code path per challenge type.

use super::super::domain::RoleKind;
use super::{AccessFacts, Decision, DenialReason, MaskScope, ReviewAction};

pub(super) fn decide_read(facts: &AccessFacts<'_>, action: &ReviewAction<'_>) -> Decision {
    let Some(review) = facts.review else {
        // Challenge-level listing gate; per-record filtering happens when the
        // caller re-enters with each concrete review.
        if !facts.roles.is_empty() || !facts.own_submission_ids.is_empty() {
            return Decision::allow();
        }
        return Decision::Deny(DenialReason::ForbiddenReviewAccess);
    };

    let challenge = facts.challenge;
    let is_copilot = facts.has_role(RoleKind::Copilot);
    let reviewer_class = facts.has_reviewer_class_role();
    let owns_submission = facts.owns_submission_of(review);
    let submitter = facts.has_role(RoleKind::Submitter) || !facts.own_submission_ids.is_empty();

    if challenge.status.is_terminal() {
        if is_copilot || reviewer_class {
            return Decision::allow();
        }
        if submitter {
            if facts.has_passing_submission || owns_submission {
                return Decision::allow();
            }
            return Decision::Deny(DenialReason::ForbiddenReviewAccess);
        }
        return Decision::Deny(DenialReason::ForbiddenReviewAccess);
    }

    if is_copilot {
        return Decision::allow();
    }

    if reviewer_class {
        if facts.owns_review(review) {
            return Decision::allow();
        }
        // Screening-phase reviews are shared across the assigned screening
        // and review roles even before the challenge closes.
        let screening_phase = challenge
            .phase(&review.phase_id)
            .map(|phase| facts.phases.is_screening(&phase.name))
            .unwrap_or(false);
        let sees_screening = facts
            .roles
            .iter()
            .any(|role| role.kind.sees_screening_reviews());
        if screening_phase && sees_screening {
            return Decision::allow();
        }
        return Decision::Deny(DenialReason::ForbiddenReviewAccess);
    }

    if owns_submission {
        let open_appeal_window = challenge
            .phases
            .iter()
            .any(|phase| phase.is_open && facts.phases.is_appeal(&phase.name));
        if open_appeal_window {
            return Decision::allow();
        }

        // Phase-by-phase results: once the review's own phase has actually
        // ended, the submitter may read it even on an active challenge.
        if challenge
            .phase(&review.phase_id)
            .map(|phase| phase.has_closed())
            .unwrap_or(false)
        {
            return Decision::allow();
        }

        // Marathon-match and First2Finish cadence publishes review content
        // continuously; only the in-flight scores stay hidden.
        if challenge.kind.broadened_visibility() {
            return Decision::AllowWithMask(MaskScope::ScoresOnly);
        }

        return match action {
            ReviewAction::ListReviews => Decision::AllowWithMask(MaskScope::Full),
            _ => Decision::Deny(DenialReason::ForbiddenReviewAccessPhase),
        };
    }

    Decision::Deny(DenialReason::ForbiddenReviewAccess)
}
