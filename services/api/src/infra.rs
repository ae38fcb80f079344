use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use metrics_exporter_prometheus::PrometheusHandle;
use review_engine::config::PhaseConfig;
use review_engine::reviews::{
    AuditRecord, AuditSinkError, AuditStore, ChallengeDirectory, ChallengeId, ChallengeKind,
    ChallengeSnapshot, ChallengeStatus, DirectoryError, EventPublisher, PhaseId, PhaseSnapshot,
    PublishError, QuestionId, QuestionKind, RepositoryError, Resource, ResourceDirectory,
    ResourceId, Review, ReviewEvent, ReviewId, ReviewQuery, ReviewRepository, ReviewService,
    ScorecardCatalog, ScorecardGroup, ScorecardId, ScorecardQuestion, ScorecardSection,
    ScorecardTree, Submission, SubmissionId, SubmissionStore,
};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryReviewRepository {
    records: Mutex<HashMap<ReviewId, Review>>,
    sequence: AtomicUsize,
}

impl ReviewRepository for InMemoryReviewRepository {
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
        if guard.contains_key(&review.id) {
            guard.insert(review.id.clone(), review);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
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
pub(crate) struct InMemoryScorecardCatalog {
    trees: Mutex<HashMap<ScorecardId, ScorecardTree>>,
}

impl InMemoryScorecardCatalog {
    pub(crate) fn seed(&self, tree: ScorecardTree) {
        self.trees
            .lock()
            .expect("scorecard mutex poisoned")
            .insert(tree.scorecard_id.clone(), tree);
    }
}

impl ScorecardCatalog for InMemoryScorecardCatalog {
    fn scorecard_tree(&self, id: &ScorecardId) -> Result<Option<ScorecardTree>, DirectoryError> {
        let guard = self.trees.lock().expect("scorecard mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryChallengeDirectory {
    snapshots: Mutex<HashMap<ChallengeId, ChallengeSnapshot>>,
}

impl InMemoryChallengeDirectory {
    pub(crate) fn seed(&self, snapshot: ChallengeSnapshot) {
        self.snapshots
            .lock()
            .expect("challenge mutex poisoned")
            .insert(snapshot.id.clone(), snapshot);
    }
}

impl ChallengeDirectory for InMemoryChallengeDirectory {
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
pub(crate) struct InMemoryResourceDirectory {
    records: Mutex<Vec<Resource>>,
}

impl InMemoryResourceDirectory {
    pub(crate) fn seed(&self, record: Resource) {
        self.records
            .lock()
            .expect("resource mutex poisoned")
            .push(record);
    }
}

impl ResourceDirectory for InMemoryResourceDirectory {
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
pub(crate) struct InMemorySubmissionStore {
    records: Mutex<Vec<Submission>>,
    passing: Mutex<BTreeSet<(ChallengeId, String)>>,
}

impl InMemorySubmissionStore {
    pub(crate) fn seed(&self, record: Submission) {
        self.records
            .lock()
            .expect("submission mutex poisoned")
            .push(record);
    }
}

impl SubmissionStore for InMemorySubmissionStore {
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

/// Bus adapter that logs every event and keeps it for inspection.
#[derive(Default)]
pub(crate) struct LoggingEventBus {
    events: Mutex<Vec<ReviewEvent>>,
}

impl LoggingEventBus {
    pub(crate) fn events(&self) -> Vec<ReviewEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for LoggingEventBus {
    fn publish(&self, event: ReviewEvent) -> Result<(), PublishError> {
        info!(topic = %event.topic, review_id = %event.review_id.0, "review event published");
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryAuditLog {
    entries: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditLog {
    pub(crate) fn entries(&self) -> Vec<AuditRecord> {
        self.entries.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditStore for InMemoryAuditLog {
    fn append(&self, record: AuditRecord) -> Result<(), AuditSinkError> {
        self.entries
            .lock()
            .expect("audit mutex poisoned")
            .push(record);
        Ok(())
    }
}

pub(crate) const DEMO_CHALLENGE: &str = "c-2001";
pub(crate) const DEMO_SCORECARD: &str = "sc-quality";
pub(crate) const DEMO_REVIEW_PHASE: &str = "ph-review";
pub(crate) const DEMO_SUBMISSION: &str = "s-9001";
pub(crate) const DEMO_REVIEWER: &str = "rev-maya";
pub(crate) const DEMO_REVIEWER_RESOURCE: &str = "res-5001";
pub(crate) const DEMO_COPILOT: &str = "cop-iris";
pub(crate) const DEMO_SUBMITTER: &str = "sub-ken";

/// Service plus handles to the collaborators the demo and the process-local
/// deployment inspect.
pub(crate) struct Seeded {
    pub(crate) service: Arc<ReviewService>,
    pub(crate) events: Arc<LoggingEventBus>,
    pub(crate) audit: Arc<InMemoryAuditLog>,
}

fn question(id: &str, kind: QuestionKind, weight: f64, scale_max: Option<f64>) -> ScorecardQuestion {
    ScorecardQuestion {
        id: QuestionId(id.to_string()),
        weight,
        kind,
        scale_min: scale_max.map(|_| 0.0),
        scale_max,
    }
}

fn quality_scorecard() -> ScorecardTree {
    ScorecardTree {
        scorecard_id: ScorecardId(DEMO_SCORECARD.to_string()),
        groups: vec![
            ScorecardGroup {
                weight: 70.0,
                sections: vec![ScorecardSection {
                    weight: 1.0,
                    questions: vec![
                        question("q-functional", QuestionKind::Scale, 3.0, Some(4.0)),
                        question("q-tests", QuestionKind::YesNo, 1.0, None),
                    ],
                }],
            },
            ScorecardGroup {
                weight: 30.0,
                sections: vec![ScorecardSection {
                    weight: 1.0,
                    questions: vec![question("q-docs", QuestionKind::YesNo, 1.0, None)],
                }],
            },
        ],
    }
}

fn seeded_challenge() -> ChallengeSnapshot {
    let phase = |id: &str, name: &str, is_open: bool| PhaseSnapshot {
        id: PhaseId(id.to_string()),
        name: name.to_string(),
        is_open,
        actual_end_time: None,
    };
    ChallengeSnapshot {
        id: ChallengeId(DEMO_CHALLENGE.to_string()),
        status: ChallengeStatus::Active,
        kind: ChallengeKind::Standard,
        phases: vec![
            phase("ph-submission", "Submission", false),
            phase(DEMO_REVIEW_PHASE, "Review", true),
            phase("ph-appeals", "Appeals", false),
        ],
    }
}

fn resource(id: &str, member: &str, role: &str, phase_id: Option<&str>) -> Resource {
    Resource {
        id: ResourceId(id.to_string()),
        challenge_id: ChallengeId(DEMO_CHALLENGE.to_string()),
        member_id: member.to_string(),
        role_name: role.to_string(),
        phase_id: phase_id.map(|id| PhaseId(id.to_string())),
    }
}

/// Wire the review service against seeded in-memory collaborators: one
/// active challenge mid-review, its scorecard, and the assigned members.
pub(crate) fn seeded_service(phases: PhaseConfig) -> Seeded {
    let repository = Arc::new(InMemoryReviewRepository::default());
    let scorecards = Arc::new(InMemoryScorecardCatalog::default());
    let challenges = Arc::new(InMemoryChallengeDirectory::default());
    let resources = Arc::new(InMemoryResourceDirectory::default());
    let submissions = Arc::new(InMemorySubmissionStore::default());
    let events = Arc::new(LoggingEventBus::default());
    let audit = Arc::new(InMemoryAuditLog::default());

    scorecards.seed(quality_scorecard());
    challenges.seed(seeded_challenge());
    resources.seed(resource(
        DEMO_REVIEWER_RESOURCE,
        DEMO_REVIEWER,
        "Reviewer",
        Some(DEMO_REVIEW_PHASE),
    ));
    resources.seed(resource("res-5002", DEMO_COPILOT, "Copilot", None));
    resources.seed(resource("res-5003", DEMO_SUBMITTER, "Submitter", None));
    submissions.seed(Submission {
        id: SubmissionId(DEMO_SUBMISSION.to_string()),
        challenge_id: ChallengeId(DEMO_CHALLENGE.to_string()),
        member_id: DEMO_SUBMITTER.to_string(),
    });

    let service = Arc::new(ReviewService::new(
        repository,
        scorecards,
        challenges,
        resources,
        submissions,
        events.clone(),
        audit.clone(),
        phases,
    ));

    Seeded {
        service,
        events,
        audit,
    }
}
