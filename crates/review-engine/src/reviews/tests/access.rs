use std::collections::BTreeSet;

use super::common::*;
use crate::config::PhaseConfig;
use crate::reviews::access::{decide, AccessFacts, Decision, DenialReason, MaskScope, ReviewAction};
use crate::reviews::domain::{
    Actor, ChallengeKind, ChallengeSnapshot, ResolvedRole, ResourceId, Review, ReviewStatus,
    SubmissionId,
};
use crate::reviews::patch::{ReviewItemPatch, ReviewPatch};

struct Scenario {
    actor: Actor,
    roles: Vec<ResolvedRole>,
    challenge: ChallengeSnapshot,
    review: Review,
    own_submissions: BTreeSet<SubmissionId>,
    has_passing: bool,
    phases: PhaseConfig,
}

impl Scenario {
    fn facts(&self) -> AccessFacts<'_> {
        AccessFacts {
            actor: &self.actor,
            roles: &self.roles,
            challenge: &self.challenge,
            review: Some(&self.review),
            own_submission_ids: &self.own_submissions,
            has_passing_submission: self.has_passing,
            phases: &self.phases,
        }
    }
}

fn reviewer_scenario() -> Scenario {
    Scenario {
        actor: reviewer(),
        roles: vec![reviewer_role()],
        challenge: active_challenge(),
        review: seeded_review(),
        own_submissions: BTreeSet::new(),
        has_passing: false,
        phases: PhaseConfig::default(),
    }
}

fn submitter_scenario() -> Scenario {
    Scenario {
        actor: submitter(),
        roles: vec![submitter_role()],
        challenge: active_challenge(),
        review: seeded_review(),
        own_submissions: submissions_set(&[SUBMISSION]),
        has_passing: false,
        phases: PhaseConfig::default(),
    }
}

fn assert_denied(decision: Decision, reason: DenialReason) {
    match decision {
        Decision::Deny(actual) => assert_eq!(actual, reason),
        other => panic!("expected denial {reason:?}, got {other:?}"),
    }
}

#[test]
fn machine_and_admin_bypass_every_action() {
    let mut scenario = reviewer_scenario();
    scenario.actor = Actor::machine();
    scenario.roles = Vec::new();
    assert!(decide(&scenario.facts(), &ReviewAction::DeleteReview).is_allowed());
    assert!(decide(&scenario.facts(), &ReviewAction::ReadReview).is_allowed());

    scenario.actor = Actor::admin("mem-admin");
    assert!(decide(&scenario.facts(), &ReviewAction::DeleteReview).is_allowed());
}

#[test]
fn immutable_fields_denied_regardless_of_actor() {
    let patch = ReviewPatch {
        resource_id: Some(ResourceId("res-new".to_string())),
        ..ReviewPatch::default()
    };

    let mut scenario = reviewer_scenario();
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::UpdateReview(&patch)),
        DenialReason::ImmutableFields,
    );

    scenario.actor = Actor::admin("mem-admin");
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::UpdateReview(&patch)),
        DenialReason::ImmutableFields,
    );

    scenario.actor = Actor::machine();
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::UpdateReview(&patch)),
        DenialReason::ImmutableFields,
    );
}

#[test]
fn non_owner_reviewer_cannot_update_review() {
    let mut scenario = reviewer_scenario();
    scenario.actor = other_reviewer();
    scenario.roles = vec![ResolvedRole::from_resource(resource(
        OTHER_REVIEWER_RESOURCE,
        OTHER_REVIEWER,
        "Reviewer",
        Some(REVIEW_PHASE),
    ))];

    let patch = ReviewPatch::status(ReviewStatus::Completed);
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::UpdateReview(&patch)),
        DenialReason::NotOwner,
    );
}

#[test]
fn owner_may_update_until_review_or_challenge_completes() {
    let mut scenario = reviewer_scenario();
    let patch = ReviewPatch::status(ReviewStatus::Completed);
    assert!(decide(&scenario.facts(), &ReviewAction::UpdateReview(&patch)).is_allowed());

    scenario.review.status = ReviewStatus::Completed;
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::UpdateReview(&patch)),
        DenialReason::PhaseClosed,
    );

    scenario.review.status = ReviewStatus::InProgress;
    scenario.challenge = completed_challenge();
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::UpdateReview(&patch)),
        DenialReason::PhaseClosed,
    );
}

#[test]
fn copilot_may_reopen_or_update_status_only() {
    let mut scenario = reviewer_scenario();
    scenario.actor = copilot();
    scenario.roles = vec![copilot_role()];
    scenario.review.status = ReviewStatus::Completed;

    let reopen = ReviewPatch::status(ReviewStatus::Pending);
    assert!(decide(&scenario.facts(), &ReviewAction::UpdateReview(&reopen)).is_allowed());

    let reopen_committed = ReviewPatch {
        status: Some(ReviewStatus::Pending),
        committed: Some(true),
        ..ReviewPatch::default()
    };
    assert_denied(
        decide(
            &scenario.facts(),
            &ReviewAction::UpdateReview(&reopen_committed),
        ),
        DenialReason::NotOwner,
    );

    let metadata_edit = ReviewPatch {
        status: Some(ReviewStatus::Pending),
        metadata: Some(serde_json::json!({"note": "x"})),
        ..ReviewPatch::default()
    };
    assert_denied(
        decide(
            &scenario.facts(),
            &ReviewAction::UpdateReview(&metadata_edit),
        ),
        DenialReason::NotOwner,
    );
}

#[test]
fn copilot_item_edits_are_score_scoped() {
    let mut scenario = reviewer_scenario();
    scenario.actor = copilot();
    scenario.roles = vec![copilot_role()];

    let beyond_scope = ReviewItemPatch {
        final_answer: Some("8".to_string()),
        initial_answer: Some("2".to_string()),
        manager_comment: Some("adjusting".to_string()),
        ..ReviewItemPatch::default()
    };
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::UpdateItem(&beyond_scope)),
        DenialReason::CopilotScope,
    );

    let no_comment = ReviewItemPatch::final_answer("8");
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::UpdateItem(&no_comment)),
        DenialReason::ManagerCommentRequired,
    );

    let blank_comment = ReviewItemPatch {
        final_answer: Some("8".to_string()),
        manager_comment: Some("   ".to_string()),
        ..ReviewItemPatch::default()
    };
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::UpdateItem(&blank_comment)),
        DenialReason::ManagerCommentRequired,
    );

    // The comment exists to justify a score override; it cannot be
    // rewritten on its own.
    let comment_only = ReviewItemPatch {
        manager_comment: Some("editorializing".to_string()),
        ..ReviewItemPatch::default()
    };
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::UpdateItem(&comment_only)),
        DenialReason::CopilotScope,
    );

    let justified = ReviewItemPatch {
        final_answer: Some("8".to_string()),
        manager_comment: Some("score adjusted after appeal".to_string()),
        ..ReviewItemPatch::default()
    };
    match decide(&scenario.facts(), &ReviewAction::UpdateItem(&justified)) {
        Decision::Allow {
            requires_manager_comment,
        } => assert!(requires_manager_comment),
        other => panic!("expected allow, got {other:?}"),
    }
}

#[test]
fn copilot_cannot_create_or_delete_items() {
    let mut scenario = reviewer_scenario();
    scenario.actor = copilot();
    scenario.roles = vec![copilot_role()];

    assert_denied(
        decide(&scenario.facts(), &ReviewAction::DeleteItem),
        DenialReason::CopilotScope,
    );
}

#[test]
fn admin_score_edit_requires_manager_comment() {
    let mut scenario = reviewer_scenario();
    scenario.actor = Actor::admin("mem-admin");
    scenario.roles = Vec::new();

    let no_comment = ReviewItemPatch::final_answer("3");
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::UpdateItem(&no_comment)),
        DenialReason::ManagerCommentRequired,
    );

    let justified = ReviewItemPatch {
        final_answer: Some("3".to_string()),
        manager_comment: Some("manual correction".to_string()),
        ..ReviewItemPatch::default()
    };
    assert!(decide(&scenario.facts(), &ReviewAction::UpdateItem(&justified)).is_allowed());
}

#[test]
fn delete_review_is_copilot_only_among_members() {
    let scenario = reviewer_scenario();
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::DeleteReview),
        DenialReason::NotOwner,
    );

    let mut copilot_scenario = reviewer_scenario();
    copilot_scenario.actor = copilot();
    copilot_scenario.roles = vec![copilot_role()];
    assert!(decide(&copilot_scenario.facts(), &ReviewAction::DeleteReview).is_allowed());
}

#[test]
fn create_review_requires_matching_reviewer_resource_and_phase() {
    let scenario = reviewer_scenario();
    let owned = ResourceId(REVIEWER_RESOURCE.to_string());
    assert!(decide(
        &scenario.facts(),
        &ReviewAction::CreateReview {
            resource_id: &owned
        }
    )
    .is_allowed());

    let foreign = ResourceId("res-unknown".to_string());
    assert_denied(
        decide(
            &scenario.facts(),
            &ReviewAction::CreateReview {
                resource_id: &foreign
            },
        ),
        DenialReason::NotOwner,
    );

    // Resource pinned to a non-review phase.
    let mut mismatched = reviewer_scenario();
    mismatched.roles = vec![ResolvedRole::from_resource(resource(
        REVIEWER_RESOURCE,
        REVIEWER,
        "Reviewer",
        Some(SUBMISSION_PHASE),
    ))];
    assert_denied(
        decide(
            &mismatched.facts(),
            &ReviewAction::CreateReview {
                resource_id: &owned
            },
        ),
        DenialReason::ResourcePhaseMismatch,
    );

    // Review phase exists but has already closed.
    let mut closed = reviewer_scenario();
    closed.challenge.phases = vec![phase(REVIEW_PHASE, "Review", false, true)];
    assert_denied(
        decide(
            &closed.facts(),
            &ReviewAction::CreateReview {
                resource_id: &owned
            },
        ),
        DenialReason::PhaseClosed,
    );
}

#[test]
fn reviewer_reads_only_own_reviews_until_challenge_closes() {
    let mut scenario = reviewer_scenario();
    scenario.actor = other_reviewer();
    scenario.roles = vec![ResolvedRole::from_resource(resource(
        OTHER_REVIEWER_RESOURCE,
        OTHER_REVIEWER,
        "Reviewer",
        Some(REVIEW_PHASE),
    ))];

    assert_denied(
        decide(&scenario.facts(), &ReviewAction::ReadReview),
        DenialReason::ForbiddenReviewAccess,
    );

    scenario.challenge = completed_challenge();
    assert!(decide(&scenario.facts(), &ReviewAction::ReadReview).is_allowed());
}

#[test]
fn screening_reviews_are_shared_across_screening_roles() {
    let mut scenario = reviewer_scenario();
    scenario.actor = other_reviewer();
    scenario.roles = vec![ResolvedRole::from_resource(resource(
        "res-screener",
        OTHER_REVIEWER,
        "Screener",
        Some("ph-screening"),
    ))];
    scenario.challenge.phases.push(phase("ph-screening", "Screening", true, false));
    scenario.review.phase_id = crate::reviews::domain::PhaseId("ph-screening".to_string());

    assert!(decide(&scenario.facts(), &ReviewAction::ReadReview).is_allowed());
}

#[test]
fn submitter_reads_own_review_once_its_phase_closes() {
    let mut scenario = submitter_scenario();

    // Review phase still open: direct read denied, listing shows a husk.
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::ReadReview),
        DenialReason::ForbiddenReviewAccessPhase,
    );
    match decide(&scenario.facts(), &ReviewAction::ListReviews) {
        Decision::AllowWithMask(MaskScope::Full) => {}
        other => panic!("expected full mask in listing, got {other:?}"),
    }

    // Phase closed with an actual end time: readable even though the
    // challenge is still active.
    scenario.challenge.phases = vec![
        phase(SUBMISSION_PHASE, "Submission", false, true),
        phase(REVIEW_PHASE, "Review", false, true),
    ];
    assert!(decide(&scenario.facts(), &ReviewAction::ReadReview).is_allowed());
}

#[test]
fn submitter_reads_own_review_during_open_appeals() {
    let mut scenario = submitter_scenario();
    scenario.challenge.phases = vec![
        phase(REVIEW_PHASE, "Review", true, false),
        phase(APPEALS_PHASE, "Appeals", true, false),
    ];
    assert!(decide(&scenario.facts(), &ReviewAction::ReadReview).is_allowed());
}

#[test]
fn marathon_match_reads_are_masked_to_hide_scores() {
    let mut scenario = submitter_scenario();
    scenario.challenge.kind = ChallengeKind::MarathonMatch;

    match decide(&scenario.facts(), &ReviewAction::ReadReview) {
        Decision::AllowWithMask(MaskScope::ScoresOnly) => {}
        other => panic!("expected scores-only mask, got {other:?}"),
    }
}

#[test]
fn terminal_challenge_submitter_without_passing_sees_only_own() {
    let mut scenario = submitter_scenario();
    scenario.challenge = completed_challenge();

    // Own submission's review is readable.
    assert!(decide(&scenario.facts(), &ReviewAction::ReadReview).is_allowed());

    // A review of someone else's submission is not.
    scenario.review.submission_id = Some(SubmissionId(OTHER_SUBMISSION.to_string()));
    assert_denied(
        decide(&scenario.facts(), &ReviewAction::ReadReview),
        DenialReason::ForbiddenReviewAccess,
    );

    // With a passing submission the whole challenge opens up.
    scenario.has_passing = true;
    assert!(decide(&scenario.facts(), &ReviewAction::ReadReview).is_allowed());
}

#[test]
fn actor_with_no_challenge_relationship_is_denied() {
    let mut scenario = reviewer_scenario();
    scenario.actor = Actor::member("mem-stranger");
    scenario.roles = Vec::new();
    scenario.own_submissions = BTreeSet::new();

    assert_denied(
        decide(&scenario.facts(), &ReviewAction::ReadReview),
        DenialReason::ForbiddenReviewAccess,
    );
}
