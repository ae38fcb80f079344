use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};

use crate::config::PhaseConfig;
use crate::reviews::audit::AuditRecord;
use crate::reviews::domain::{
    Actor, ChallengeId, ChallengeKind, ChallengeSnapshot, ChallengeStatus, PhaseId, PhaseSnapshot,
    QuestionId, QuestionKind, ResolvedRole, Resource, ResourceId, Review, ReviewId, ReviewItem,
    ReviewStatus, ScorecardGroup, ScorecardId, ScorecardQuestion, ScorecardSection, ScorecardTree,
    Submission, SubmissionId,
};
use crate::reviews::repository::{
    AuditSinkError, AuditStore, ChallengeDirectory, DirectoryError, EventPublisher, PublishError,
    RepositoryError, ResourceDirectory, ReviewEvent, ReviewRepository, ScorecardCatalog,
    SubmissionStore,
};
use crate::reviews::query::ReviewQuery;
use crate::reviews::service::ReviewService;

pub(super) const CHALLENGE: &str = "c-100";
pub(super) const SCORECARD: &str = "sc-1";
pub(super) const REVIEW_PHASE: &str = "ph-review";
pub(super) const SUBMISSION_PHASE: &str = "ph-submission";
pub(super) const APPEALS_PHASE: &str = "ph-appeals";
pub(super) const REVIEWER: &str = "mem-reviewer";
pub(super) const OTHER_REVIEWER: &str = "mem-reviewer-2";
pub(super) const COPILOT: &str = "mem-copilot";
pub(super) const SUBMITTER: &str = "mem-submitter";
pub(super) const REVIEWER_RESOURCE: &str = "res-reviewer";
pub(super) const OTHER_REVIEWER_RESOURCE: &str = "res-reviewer-2";
pub(super) const SUBMISSION: &str = "sub-1";
pub(super) const OTHER_SUBMISSION: &str = "sub-2";

pub(super) fn question(id: &str, kind: QuestionKind, weight: f64) -> ScorecardQuestion {
    let (scale_min, scale_max) = match kind {
        QuestionKind::Scale | QuestionKind::TestCase => (Some(0.0), Some(10.0)),
        _ => (None, None),
    };
    ScorecardQuestion {
        id: QuestionId(id.to_string()),
        weight,
        kind,
        scale_min,
        scale_max,
    }
}

/// Two groups weighted 60/40: a yes/no question and a 0..10 scale question.
/// Answering "yes" and "5" yields 80.00.
pub(super) fn standard_tree() -> ScorecardTree {
    ScorecardTree {
        scorecard_id: ScorecardId(SCORECARD.to_string()),
        groups: vec![
            ScorecardGroup {
                weight: 60.0,
                sections: vec![ScorecardSection {
                    weight: 1.0,
                    questions: vec![question("q-yes", QuestionKind::YesNo, 1.0)],
                }],
            },
            ScorecardGroup {
                weight: 40.0,
                sections: vec![ScorecardSection {
                    weight: 1.0,
                    questions: vec![question("q-scale", QuestionKind::Scale, 1.0)],
                }],
            },
        ],
    }
}

pub(super) fn item(question_id: &str, initial: &str) -> ReviewItem {
    ReviewItem {
        scorecard_question_id: QuestionId(question_id.to_string()),
        initial_answer: initial.to_string(),
        final_answer: None,
        manager_comment: None,
        comments: Vec::new(),
    }
}

pub(super) fn phase(id: &str, name: &str, is_open: bool, ended: bool) -> PhaseSnapshot {
    PhaseSnapshot {
        id: PhaseId(id.to_string()),
        name: name.to_string(),
        is_open,
        actual_end_time: ended.then(|| Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
    }
}

pub(super) fn active_challenge() -> ChallengeSnapshot {
    ChallengeSnapshot {
        id: ChallengeId(CHALLENGE.to_string()),
        status: ChallengeStatus::Active,
        kind: ChallengeKind::Standard,
        phases: vec![
            phase(SUBMISSION_PHASE, "Submission", false, true),
            phase(REVIEW_PHASE, "Review", true, false),
            phase(APPEALS_PHASE, "Appeals", false, false),
        ],
    }
}

pub(super) fn completed_challenge() -> ChallengeSnapshot {
    ChallengeSnapshot {
        status: ChallengeStatus::Completed,
        phases: vec![
            phase(SUBMISSION_PHASE, "Submission", false, true),
            phase(REVIEW_PHASE, "Review", false, true),
            phase(APPEALS_PHASE, "Appeals", false, true),
        ],
        ..active_challenge()
    }
}

pub(super) fn resource(id: &str, member: &str, role: &str, phase_id: Option<&str>) -> Resource {
    Resource {
        id: ResourceId(id.to_string()),
        challenge_id: ChallengeId(CHALLENGE.to_string()),
        member_id: member.to_string(),
        role_name: role.to_string(),
        phase_id: phase_id.map(|id| PhaseId(id.to_string())),
    }
}

pub(super) fn reviewer_role() -> ResolvedRole {
    ResolvedRole::from_resource(resource(
        REVIEWER_RESOURCE,
        REVIEWER,
        "Reviewer",
        Some(REVIEW_PHASE),
    ))
}

pub(super) fn copilot_role() -> ResolvedRole {
    ResolvedRole::from_resource(resource("res-copilot", COPILOT, "Copilot", None))
}

pub(super) fn submitter_role() -> ResolvedRole {
    ResolvedRole::from_resource(resource("res-submitter", SUBMITTER, "Submitter", None))
}

pub(super) fn seeded_review() -> Review {
    Review {
        id: ReviewId("review-seeded".to_string()),
        challenge_id: ChallengeId(CHALLENGE.to_string()),
        resource_id: ResourceId(REVIEWER_RESOURCE.to_string()),
        submission_id: Some(SubmissionId(SUBMISSION.to_string())),
        scorecard_id: ScorecardId(SCORECARD.to_string()),
        phase_id: PhaseId(REVIEW_PHASE.to_string()),
        type_id: Some("type-review".to_string()),
        status: ReviewStatus::InProgress,
        committed: false,
        initial_score: None,
        final_score: None,
        review_date: None,
        metadata: None,
        submitter_handle: Some("challenger".to_string()),
        submitter_max_rating: Some(1800),
        review_items: vec![item("q-yes", "yes"), item("q-scale", "5")],
        appeals: Vec::new(),
    }
}

pub(super) fn submissions_set(ids: &[&str]) -> BTreeSet<SubmissionId> {
    ids.iter().map(|id| SubmissionId(id.to_string())).collect()
}

#[derive(Default)]
pub(super) struct MemoryReviews {
    records: Mutex<HashMap<ReviewId, Review>>,
    writes: AtomicUsize,
    sequence: AtomicUsize,
}

impl MemoryReviews {
    pub(super) fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub(super) fn seed(&self, review: Review) {
        self.records
            .lock()
            .expect("review mutex poisoned")
            .insert(review.id.clone(), review);
    }
}

impl ReviewRepository for MemoryReviews {
    fn allocate_id(&self) -> Result<ReviewId, RepositoryError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(ReviewId(format!("review-{id:06}")))
    }

    fn insert(&self, review: Review) -> Result<Review, RepositoryError> {
        let mut guard = self.records.lock().expect("review mutex poisoned");
        if guard.contains_key(&review.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(review.id.clone(), review.clone());
        Ok(review)
    }

    fn update(&self, review: Review) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("review mutex poisoned");
        if !guard.contains_key(&review.id) {
            return Err(RepositoryError::NotFound);
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        guard.insert(review.id.clone(), review);
        Ok(())
    }

    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        let guard = self.records.lock().expect("review mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn delete(&self, id: &ReviewId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("review mutex poisoned");
        guard
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn list(&self, query: &ReviewQuery) -> Result<Vec<Review>, RepositoryError> {
        let guard = self.records.lock().expect("review mutex poisoned");
        let mut rows: Vec<Review> = guard
            .values()
            .filter(|review| query.matches(review))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows)
    }
}

#[derive(Default)]
pub(super) struct MemoryScorecards {
    trees: Mutex<HashMap<ScorecardId, ScorecardTree>>,
}

impl MemoryScorecards {
    pub(super) fn seed(&self, tree: ScorecardTree) {
        self.trees
            .lock()
            .expect("scorecard mutex poisoned")
            .insert(tree.scorecard_id.clone(), tree);
    }
}

impl ScorecardCatalog for MemoryScorecards {
    fn scorecard_tree(&self, id: &ScorecardId) -> Result<Option<ScorecardTree>, DirectoryError> {
        let guard = self.trees.lock().expect("scorecard mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryChallenges {
    snapshots: Mutex<HashMap<ChallengeId, ChallengeSnapshot>>,
}

impl MemoryChallenges {
    pub(super) fn seed(&self, snapshot: ChallengeSnapshot) {
        self.snapshots
            .lock()
            .expect("challenge mutex poisoned")
            .insert(snapshot.id.clone(), snapshot);
    }
}

impl ChallengeDirectory for MemoryChallenges {
    fn challenge(&self, id: &ChallengeId) -> Result<Option<ChallengeSnapshot>, DirectoryError> {
        let guard = self.snapshots.lock().expect("challenge mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn challenges(&self, ids: &[ChallengeId]) -> Result<Vec<ChallengeSnapshot>, DirectoryError> {
        let guard = self.snapshots.lock().expect("challenge mutex poisoned");
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryResources {
    records: Mutex<Vec<Resource>>,
}

impl MemoryResources {
    pub(super) fn seed(&self, record: Resource) {
        self.records
            .lock()
            .expect("resource mutex poisoned")
            .push(record);
    }
}

impl ResourceDirectory for MemoryResources {
    fn member_resources(
        &self,
        challenge_id: &ChallengeId,
        member_id: &str,
    ) -> Result<Vec<Resource>, DirectoryError> {
        let guard = self.records.lock().expect("resource mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| &record.challenge_id == challenge_id && record.member_id == member_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemorySubmissions {
    records: Mutex<Vec<Submission>>,
    passing: Mutex<BTreeSet<(ChallengeId, String)>>,
}

impl MemorySubmissions {
    pub(super) fn seed(&self, record: Submission) {
        self.records
            .lock()
            .expect("submission mutex poisoned")
            .push(record);
    }

    pub(super) fn mark_passing(&self, challenge_id: &str, member_id: &str) {
        self.passing.lock().expect("passing mutex poisoned").insert((
            ChallengeId(challenge_id.to_string()),
            member_id.to_string(),
        ));
    }
}

impl SubmissionStore for MemorySubmissions {
    fn submission(&self, id: &SubmissionId) -> Result<Option<Submission>, DirectoryError> {
        let guard = self.records.lock().expect("submission mutex poisoned");
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }

    fn member_submissions(
        &self,
        challenge_id: &ChallengeId,
        member_id: &str,
    ) -> Result<Vec<Submission>, DirectoryError> {
        let guard = self.records.lock().expect("submission mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| &record.challenge_id == challenge_id && record.member_id == member_id)
            .cloned()
            .collect())
    }

    fn has_passing_submission(
        &self,
        challenge_id: &ChallengeId,
        member_id: &str,
    ) -> Result<bool, DirectoryError> {
        let guard = self.passing.lock().expect("passing mutex poisoned");
        Ok(guard.contains(&(challenge_id.clone(), member_id.to_string())))
    }
}

#[derive(Default)]
pub(super) struct MemoryEvents {
    published: Mutex<Vec<ReviewEvent>>,
}

impl MemoryEvents {
    pub(super) fn published(&self) -> Vec<ReviewEvent> {
        self.published.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for MemoryEvents {
    fn publish(&self, event: ReviewEvent) -> Result<(), PublishError> {
        self.published
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryAudit {
    entries: Mutex<Vec<AuditRecord>>,
}

impl MemoryAudit {
    pub(super) fn entries(&self) -> Vec<AuditRecord> {
        self.entries.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditStore for MemoryAudit {
    fn append(&self, record: AuditRecord) -> Result<(), AuditSinkError> {
        self.entries
            .lock()
            .expect("audit mutex poisoned")
            .push(record);
        Ok(())
    }
}

/// Resource directory that always fails, for ownership-unverified paths.
pub(super) struct UnreachableResources;

impl ResourceDirectory for UnreachableResources {
    fn member_resources(
        &self,
        _challenge_id: &ChallengeId,
        _member_id: &str,
    ) -> Result<Vec<Resource>, DirectoryError> {
        Err(DirectoryError::Unavailable("resource api offline".to_string()))
    }
}

/// Catalog with no scorecards, for fail-open recompute paths.
pub(super) struct EmptyScorecards;

impl ScorecardCatalog for EmptyScorecards {
    fn scorecard_tree(&self, _id: &ScorecardId) -> Result<Option<ScorecardTree>, DirectoryError> {
        Ok(None)
    }
}

pub(super) struct World {
    pub(super) service: ReviewService,
    pub(super) reviews: Arc<MemoryReviews>,
    pub(super) scorecards: Arc<MemoryScorecards>,
    pub(super) challenges: Arc<MemoryChallenges>,
    pub(super) resources: Arc<MemoryResources>,
    pub(super) submissions: Arc<MemorySubmissions>,
    pub(super) events: Arc<MemoryEvents>,
    pub(super) audit: Arc<MemoryAudit>,
}

/// World seeded with the standard challenge, scorecard, roles, and one
/// in-progress review owned by [`REVIEWER`].
pub(super) fn world() -> World {
    let reviews = Arc::new(MemoryReviews::default());
    let scorecards = Arc::new(MemoryScorecards::default());
    let challenges = Arc::new(MemoryChallenges::default());
    let resources = Arc::new(MemoryResources::default());
    let submissions = Arc::new(MemorySubmissions::default());
    let events = Arc::new(MemoryEvents::default());
    let audit = Arc::new(MemoryAudit::default());

    scorecards.seed(standard_tree());
    challenges.seed(active_challenge());
    resources.seed(resource(
        REVIEWER_RESOURCE,
        REVIEWER,
        "Reviewer",
        Some(REVIEW_PHASE),
    ));
    resources.seed(resource(
        OTHER_REVIEWER_RESOURCE,
        OTHER_REVIEWER,
        "Reviewer",
        Some(REVIEW_PHASE),
    ));
    resources.seed(resource("res-copilot", COPILOT, "Copilot", None));
    resources.seed(resource("res-submitter", SUBMITTER, "Submitter", None));
    submissions.seed(Submission {
        id: SubmissionId(SUBMISSION.to_string()),
        challenge_id: ChallengeId(CHALLENGE.to_string()),
        member_id: SUBMITTER.to_string(),
    });
    submissions.seed(Submission {
        id: SubmissionId(OTHER_SUBMISSION.to_string()),
        challenge_id: ChallengeId(CHALLENGE.to_string()),
        member_id: "mem-other-submitter".to_string(),
    });
    reviews.seed(seeded_review());

    let service = ReviewService::new(
        reviews.clone(),
        scorecards.clone(),
        challenges.clone(),
        resources.clone(),
        submissions.clone(),
        events.clone(),
        audit.clone(),
        PhaseConfig::default(),
    );

    World {
        service,
        reviews,
        scorecards,
        challenges,
        resources,
        submissions,
        events,
        audit,
    }
}

pub(super) fn reviewer() -> Actor {
    Actor::member(REVIEWER)
}

pub(super) fn other_reviewer() -> Actor {
    Actor::member(OTHER_REVIEWER)
}

pub(super) fn copilot() -> Actor {
    Actor::member(COPILOT)
}

pub(super) fn submitter() -> Actor {
    Actor::member(SUBMITTER)
}
