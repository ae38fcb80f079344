use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::access::{self, AccessFacts, Decision, DenialReason, ReviewAction};
use super::audit::AuditDiffRecorder;
use super::domain::{
    Actor, ChallengeId, ChallengeSnapshot, QuestionId, ResolvedRole, Review, ReviewId, ReviewItem,
    ReviewStatus, SubmissionId,
};
use super::masking::mask_review;
use super::patch::{ReviewDraft, ReviewItemDraft, ReviewItemPatch, ReviewPatch};
use super::query::ReviewQuery;
use super::repository::{
    AuditStore, ChallengeDirectory, DirectoryError, EventPublisher, RepositoryError,
    ResourceDirectory, ReviewEvent, ReviewRepository, ScorecardCatalog, SubmissionStore,
};
use super::scoring::ScoreRecomputeCoordinator;
use crate::config::PhaseConfig;

/// Facade composing the access engine, recompute coordinator, audit
/// recorder, and the external collaborators. Every operation takes the
/// requesting [`Actor`] and runs authorize → mutate → recompute →
/// audit-if-privileged, or authorize → mask on the read side.
pub struct ReviewService {
    repository: Arc<dyn ReviewRepository>,
    scorecards: Arc<dyn ScorecardCatalog>,
    challenges: Arc<dyn ChallengeDirectory>,
    resources: Arc<dyn ResourceDirectory>,
    submissions: Arc<dyn SubmissionStore>,
    events: Arc<dyn EventPublisher>,
    recompute: ScoreRecomputeCoordinator,
    audit: AuditDiffRecorder,
    phases: PhaseConfig,
}

/// Entities an operation can fail to locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Review,
    ReviewItem,
    Scorecard,
    Submission,
    Challenge,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EntityKind::Review => "review",
            EntityKind::ReviewItem => "review item",
            EntityKind::Scorecard => "scorecard",
            EntityKind::Submission => "submission",
            EntityKind::Challenge => "challenge",
        };
        f.write_str(label)
    }
}

/// Validation errors raised before a mutation is applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("question {} is not on the review's scorecard", .0 .0)]
    QuestionNotOnScorecard(QuestionId),
    #[error("question {} appears more than once in the item set", .0 .0)]
    DuplicateQuestion(QuestionId),
    #[error("submission does not belong to the challenge")]
    SubmissionChallengeMismatch,
}

/// Error taxonomy surfaced by the review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("{0} not found")]
    NotFound(EntityKind),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("forbidden: {0}")]
    Forbidden(DenialReason),
    #[error("record already exists")]
    Conflict,
    #[error("internal failure: {0}")]
    Internal(String),
}

impl From<RepositoryError> for ReviewServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => Self::Conflict,
            RepositoryError::NotFound => Self::NotFound(EntityKind::Review),
            RepositoryError::Unavailable(message) => Self::Internal(message),
        }
    }
}

fn internal(error: DirectoryError) -> ReviewServiceError {
    ReviewServiceError::Internal(error.to_string())
}

// Ownership lookups that fail cannot be allowed to fail open.
fn unverified(_: DirectoryError) -> ReviewServiceError {
    ReviewServiceError::Forbidden(DenialReason::OwnershipUnverified)
}

/// Per-request lookup cache: challenge snapshot, resolved roles, and the
/// actor's submissions, fetched once and not reused across requests.
struct RequestContext {
    challenge: ChallengeSnapshot,
    roles: Vec<ResolvedRole>,
    own_submission_ids: BTreeSet<SubmissionId>,
    has_passing_submission: bool,
}

impl ReviewService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<dyn ReviewRepository>,
        scorecards: Arc<dyn ScorecardCatalog>,
        challenges: Arc<dyn ChallengeDirectory>,
        resources: Arc<dyn ResourceDirectory>,
        submissions: Arc<dyn SubmissionStore>,
        events: Arc<dyn EventPublisher>,
        audit_store: Arc<dyn AuditStore>,
        phases: PhaseConfig,
    ) -> Self {
        let recompute = ScoreRecomputeCoordinator::new(repository.clone(), scorecards.clone());
        let audit = AuditDiffRecorder::new(audit_store);
        Self {
            repository,
            scorecards,
            challenges,
            resources,
            submissions,
            events,
            recompute,
            audit,
            phases,
        }
    }

    fn resolve_context(
        &self,
        actor: &Actor,
        challenge_id: &ChallengeId,
    ) -> Result<RequestContext, ReviewServiceError> {
        let challenge = self
            .challenges
            .challenge(challenge_id)
            .map_err(internal)?
            .ok_or(ReviewServiceError::NotFound(EntityKind::Challenge))?;

        let mut roles = Vec::new();
        let mut own_submission_ids = BTreeSet::new();
        let mut has_passing_submission = false;

        if !actor.is_privileged() {
            if let Some(member_id) = actor.member_id.as_deref() {
                roles = self
                    .resources
                    .member_resources(challenge_id, member_id)
                    .map_err(unverified)?
                    .into_iter()
                    .map(ResolvedRole::from_resource)
                    .collect();
                own_submission_ids = self
                    .submissions
                    .member_submissions(challenge_id, member_id)
                    .map_err(unverified)?
                    .into_iter()
                    .map(|submission| submission.id)
                    .collect();
                has_passing_submission = self
                    .submissions
                    .has_passing_submission(challenge_id, member_id)
                    .map_err(unverified)?;
            }
        }

        Ok(RequestContext {
            challenge,
            roles,
            own_submission_ids,
            has_passing_submission,
        })
    }

    fn facts<'a>(
        &'a self,
        actor: &'a Actor,
        context: &'a RequestContext,
        review: Option<&'a Review>,
    ) -> AccessFacts<'a> {
        AccessFacts {
            actor,
            roles: &context.roles,
            challenge: &context.challenge,
            review,
            own_submission_ids: &context.own_submission_ids,
            has_passing_submission: context.has_passing_submission,
            phases: &self.phases,
        }
    }

    fn require(decision: Decision) -> Result<(), ReviewServiceError> {
        match decision {
            Decision::Deny(reason) => Err(ReviewServiceError::Forbidden(reason)),
            _ => Ok(()),
        }
    }

    pub fn create_review(
        &self,
        actor: &Actor,
        draft: ReviewDraft,
    ) -> Result<Review, ReviewServiceError> {
        let context = self.resolve_context(actor, &draft.challenge_id)?;
        Self::require(access::decide(
            &self.facts(actor, &context, None),
            &ReviewAction::CreateReview {
                resource_id: &draft.resource_id,
            },
        ))?;

        if let Some(submission_id) = &draft.submission_id {
            let submission = self
                .submissions
                .submission(submission_id)
                .map_err(internal)?
                .ok_or(ReviewServiceError::NotFound(EntityKind::Submission))?;
            if submission.challenge_id != draft.challenge_id {
                return Err(ValidationError::SubmissionChallengeMismatch.into());
            }
        }

        if self
            .scorecards
            .scorecard_tree(&draft.scorecard_id)
            .map_err(internal)?
            .is_none()
        {
            return Err(ReviewServiceError::NotFound(EntityKind::Scorecard));
        }

        // One review per (resource, submission, scorecard).
        let mut duplicates = ReviewQuery::for_challenge(draft.challenge_id.clone())
            .with_resource(draft.resource_id.clone())
            .with_scorecard(draft.scorecard_id.clone());
        if let Some(submission_id) = &draft.submission_id {
            duplicates = duplicates.with_submission(submission_id.clone());
        }
        if !self.repository.list(&duplicates)?.is_empty() {
            return Err(ReviewServiceError::Conflict);
        }

        let review = Review {
            id: self.repository.allocate_id()?,
            challenge_id: draft.challenge_id,
            resource_id: draft.resource_id,
            submission_id: draft.submission_id,
            scorecard_id: draft.scorecard_id,
            phase_id: draft.phase_id,
            type_id: draft.type_id,
            status: ReviewStatus::Pending,
            committed: false,
            initial_score: None,
            final_score: None,
            review_date: None,
            metadata: draft.metadata,
            submitter_handle: draft.submitter_handle,
            submitter_max_rating: draft.submitter_max_rating,
            review_items: Vec::new(),
            appeals: Vec::new(),
        };

        let stored = self.repository.insert(review)?;
        self.recompute.recompute_best_effort(&stored.id);
        Ok(self.repository.fetch(&stored.id)?.unwrap_or(stored))
    }

    pub fn update_review(
        &self,
        actor: &Actor,
        review_id: &ReviewId,
        patch: ReviewPatch,
    ) -> Result<Review, ReviewServiceError> {
        let before = self
            .repository
            .fetch(review_id)?
            .ok_or(ReviewServiceError::NotFound(EntityKind::Review))?;
        let context = self.resolve_context(actor, &before.challenge_id)?;
        Self::require(access::decide(
            &self.facts(actor, &context, Some(&before)),
            &ReviewAction::UpdateReview(&patch),
        ))?;

        let mut after = before.clone();
        if let Some(status) = patch.status {
            after.status = status;
        }
        if let Some(committed) = patch.committed {
            after.committed = committed;
        }
        if let Some(type_id) = patch.type_id {
            after.type_id = Some(type_id);
        }
        if let Some(metadata) = patch.metadata {
            after.metadata = Some(metadata);
        }
        if let Some(review_date) = patch.review_date {
            after.review_date = Some(review_date);
        }

        let was_completed = before.status == ReviewStatus::Completed;
        let now_completed = after.status == ReviewStatus::Completed;

        if was_completed && after.status.is_open() {
            // Reopening resets the commitment and the derived scores; the
            // recompute path is intentionally not taken here.
            after.committed = false;
            after.initial_score = None;
            after.final_score = None;
            after.review_date = None;
        }
        if !was_completed && now_completed && after.review_date.is_none() {
            after.review_date = Some(Utc::now());
        }

        self.repository.update(after.clone())?;
        self.audit
            .record_if_privileged(actor, &context.roles, &before, &after);

        if !was_completed && now_completed {
            if let Err(error) = self.events.publish(ReviewEvent::completed(&after)) {
                warn!(review_id = %after.id.0, %error, "completion event dropped");
            }
        }

        Ok(after)
    }

    pub fn delete_review(
        &self,
        actor: &Actor,
        review_id: &ReviewId,
    ) -> Result<(), ReviewServiceError> {
        let review = self
            .repository
            .fetch(review_id)?
            .ok_or(ReviewServiceError::NotFound(EntityKind::Review))?;
        let context = self.resolve_context(actor, &review.challenge_id)?;
        Self::require(access::decide(
            &self.facts(actor, &context, Some(&review)),
            &ReviewAction::DeleteReview,
        ))?;

        self.repository.delete(review_id)?;
        Ok(())
    }

    pub fn create_review_item(
        &self,
        actor: &Actor,
        review_id: &ReviewId,
        draft: ReviewItemDraft,
    ) -> Result<Review, ReviewServiceError> {
        let before = self
            .repository
            .fetch(review_id)?
            .ok_or(ReviewServiceError::NotFound(EntityKind::Review))?;
        let context = self.resolve_context(actor, &before.challenge_id)?;
        Self::require(access::decide(
            &self.facts(actor, &context, Some(&before)),
            &ReviewAction::CreateItem(&draft),
        ))?;

        let tree = self
            .scorecards
            .scorecard_tree(&before.scorecard_id)
            .map_err(internal)?
            .ok_or(ReviewServiceError::NotFound(EntityKind::Scorecard))?;
        if !tree.contains_question(&draft.scorecard_question_id) {
            return Err(ValidationError::QuestionNotOnScorecard(draft.scorecard_question_id).into());
        }
        if before.item(&draft.scorecard_question_id).is_some() {
            return Err(ReviewServiceError::Conflict);
        }

        let mut after = before.clone();
        after.review_items.push(ReviewItem {
            scorecard_question_id: draft.scorecard_question_id,
            initial_answer: draft.initial_answer,
            final_answer: draft.final_answer,
            manager_comment: draft.manager_comment,
            comments: draft.comments,
        });

        self.repository.update(after.clone())?;
        self.recompute.recompute_best_effort(review_id);
        let refreshed = self.repository.fetch(review_id)?.unwrap_or(after);
        self.audit
            .record_if_privileged(actor, &context.roles, &before, &refreshed);
        Ok(refreshed)
    }

    pub fn update_review_item(
        &self,
        actor: &Actor,
        review_id: &ReviewId,
        question_id: &QuestionId,
        patch: ReviewItemPatch,
    ) -> Result<Review, ReviewServiceError> {
        let before = self
            .repository
            .fetch(review_id)?
            .ok_or(ReviewServiceError::NotFound(EntityKind::Review))?;
        let context = self.resolve_context(actor, &before.challenge_id)?;
        Self::require(access::decide(
            &self.facts(actor, &context, Some(&before)),
            &ReviewAction::UpdateItem(&patch),
        ))?;

        let position = before
            .review_items
            .iter()
            .position(|item| &item.scorecard_question_id == question_id)
            .ok_or(ReviewServiceError::NotFound(EntityKind::ReviewItem))?;

        if let Some(new_question) = &patch.scorecard_question_id {
            if new_question != question_id {
                let tree = self
                    .scorecards
                    .scorecard_tree(&before.scorecard_id)
                    .map_err(internal)?
                    .ok_or(ReviewServiceError::NotFound(EntityKind::Scorecard))?;
                if !tree.contains_question(new_question) {
                    return Err(ValidationError::QuestionNotOnScorecard(new_question.clone()).into());
                }
                if before.item(new_question).is_some() {
                    return Err(ReviewServiceError::Conflict);
                }
            }
        }

        let mut after = before.clone();
        {
            let item = &mut after.review_items[position];
            if let Some(initial_answer) = patch.initial_answer {
                item.initial_answer = initial_answer;
            }
            if let Some(final_answer) = patch.final_answer {
                item.final_answer = Some(final_answer);
            }
            if let Some(manager_comment) = patch.manager_comment {
                item.manager_comment = Some(manager_comment);
            }
            if let Some(new_question) = patch.scorecard_question_id {
                item.scorecard_question_id = new_question;
            }
            if let Some(comments) = patch.comments {
                item.comments = comments;
            }
        }

        self.repository.update(after.clone())?;
        self.recompute.recompute_best_effort(review_id);
        let refreshed = self.repository.fetch(review_id)?.unwrap_or(after);
        self.audit
            .record_if_privileged(actor, &context.roles, &before, &refreshed);
        Ok(refreshed)
    }

    pub fn delete_review_item(
        &self,
        actor: &Actor,
        review_id: &ReviewId,
        question_id: &QuestionId,
    ) -> Result<Review, ReviewServiceError> {
        let before = self
            .repository
            .fetch(review_id)?
            .ok_or(ReviewServiceError::NotFound(EntityKind::Review))?;
        let context = self.resolve_context(actor, &before.challenge_id)?;
        Self::require(access::decide(
            &self.facts(actor, &context, Some(&before)),
            &ReviewAction::DeleteItem,
        ))?;

        let mut after = before.clone();
        let original_len = after.review_items.len();
        after
            .review_items
            .retain(|item| &item.scorecard_question_id != question_id);
        if after.review_items.len() == original_len {
            return Err(ReviewServiceError::NotFound(EntityKind::ReviewItem));
        }

        self.repository.update(after.clone())?;
        self.recompute.recompute_best_effort(review_id);
        let refreshed = self.repository.fetch(review_id)?.unwrap_or(after);
        self.audit
            .record_if_privileged(actor, &context.roles, &before, &refreshed);
        Ok(refreshed)
    }

    /// Replace the whole item set in one call.
    pub fn set_review_items(
        &self,
        actor: &Actor,
        review_id: &ReviewId,
        drafts: Vec<ReviewItemDraft>,
    ) -> Result<Review, ReviewServiceError> {
        let before = self
            .repository
            .fetch(review_id)?
            .ok_or(ReviewServiceError::NotFound(EntityKind::Review))?;
        let context = self.resolve_context(actor, &before.challenge_id)?;
        Self::require(access::decide(
            &self.facts(actor, &context, Some(&before)),
            &ReviewAction::ReplaceItems(&drafts),
        ))?;

        let tree = self
            .scorecards
            .scorecard_tree(&before.scorecard_id)
            .map_err(internal)?
            .ok_or(ReviewServiceError::NotFound(EntityKind::Scorecard))?;

        let mut seen = BTreeSet::new();
        for draft in &drafts {
            if !tree.contains_question(&draft.scorecard_question_id) {
                return Err(ValidationError::QuestionNotOnScorecard(
                    draft.scorecard_question_id.clone(),
                )
                .into());
            }
            if !seen.insert(draft.scorecard_question_id.clone()) {
                return Err(
                    ValidationError::DuplicateQuestion(draft.scorecard_question_id.clone()).into(),
                );
            }
        }

        let mut after = before.clone();
        after.review_items = drafts
            .into_iter()
            .map(|draft| ReviewItem {
                scorecard_question_id: draft.scorecard_question_id,
                initial_answer: draft.initial_answer,
                final_answer: draft.final_answer,
                manager_comment: draft.manager_comment,
                comments: draft.comments,
            })
            .collect();

        self.repository.update(after.clone())?;
        self.recompute.recompute_best_effort(review_id);
        let refreshed = self.repository.fetch(review_id)?.unwrap_or(after);
        self.audit
            .record_if_privileged(actor, &context.roles, &before, &refreshed);
        Ok(refreshed)
    }

    pub fn get_review(
        &self,
        actor: &Actor,
        review_id: &ReviewId,
    ) -> Result<Review, ReviewServiceError> {
        let review = self
            .repository
            .fetch(review_id)?
            .ok_or(ReviewServiceError::NotFound(EntityKind::Review))?;
        if actor.is_privileged() {
            return Ok(review);
        }

        let context = self.resolve_context(actor, &review.challenge_id)?;
        match access::decide(
            &self.facts(actor, &context, Some(&review)),
            &ReviewAction::ReadReview,
        ) {
            Decision::Allow { .. } => Ok(review),
            Decision::AllowWithMask(scope) => Ok(mask_review(&review, scope)),
            Decision::Deny(reason) => Err(ReviewServiceError::Forbidden(reason)),
        }
    }

    /// List reviews matching the query, filtered and masked per record for
    /// the requesting actor. Non-privileged listing is challenge-scoped.
    pub fn list_reviews(
        &self,
        actor: &Actor,
        query: &ReviewQuery,
    ) -> Result<Vec<Review>, ReviewServiceError> {
        if actor.is_privileged() {
            return Ok(self.repository.list(query)?);
        }

        let Some(challenge_id) = &query.challenge_id else {
            return Err(ReviewServiceError::Forbidden(
                DenialReason::ForbiddenReviewAccess,
            ));
        };
        let context = self.resolve_context(actor, challenge_id)?;
        Self::require(access::decide(
            &self.facts(actor, &context, None),
            &ReviewAction::ListReviews,
        ))?;

        let rows = self.repository.list(query)?;
        let mut visible = Vec::new();
        for review in rows {
            let decision = access::decide(
                &self.facts(actor, &context, Some(&review)),
                &ReviewAction::ListReviews,
            );
            match decision {
                Decision::Allow { .. } => visible.push(review),
                Decision::AllowWithMask(scope) => visible.push(mask_review(&review, scope)),
                Decision::Deny(_) => {}
            }
        }
        Ok(visible)
    }
}
