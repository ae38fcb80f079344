use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::domain::{Actor, ResolvedRole, Review, ReviewItem, RoleKind};
use super::repository::AuditStore;

/// Single descriptive entry capturing a privileged mutation as a field-level
/// before/after diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub review_id: super::domain::ReviewId,
    pub challenge_id: super::domain::ChallengeId,
    pub submission_id: Option<super::domain::SubmissionId>,
    pub actor: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Records whitelisted field diffs for mutations performed by machine,
/// admin, or copilot actors.
pub struct AuditDiffRecorder {
    store: Arc<dyn AuditStore>,
}

impl AuditDiffRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// No-op for unprivileged actors, unresolvable actor identities, and
    /// empty diffs. Audit persistence failures are logged, never surfaced.
    pub fn record_if_privileged(
        &self,
        actor: &Actor,
        roles: &[ResolvedRole],
        before: &Review,
        after: &Review,
    ) {
        let privileged = actor.is_privileged() || roles.iter().any(|r| r.kind == RoleKind::Copilot);
        if !privileged {
            return;
        }
        let Some(handle) = actor.audit_handle() else {
            return;
        };

        let changes = diff_review(before, after);
        if changes.is_empty() {
            return;
        }

        let record = AuditRecord {
            review_id: after.id.clone(),
            challenge_id: after.challenge_id.clone(),
            submission_id: after.submission_id.clone(),
            actor: handle,
            description: changes.join("; "),
            created_at: Utc::now(),
        };

        if let Err(error) = self.store.append(record) {
            warn!(review_id = %after.id.0, %error, "audit entry dropped");
        }
    }
}

/// Whitelisted review-level fields plus per-question item diffs, each
/// formatted as `field: before -> after`.
pub fn diff_review(before: &Review, after: &Review) -> Vec<String> {
    let mut changes = Vec::new();

    push_if_changed(
        &mut changes,
        "status",
        before.status.label(),
        after.status.label(),
    );
    push_if_changed(
        &mut changes,
        "committed",
        fmt_bool(before.committed),
        fmt_bool(after.committed),
    );
    push_if_changed(
        &mut changes,
        "finalScore",
        fmt_score(before.final_score),
        fmt_score(after.final_score),
    );
    push_if_changed(
        &mut changes,
        "initialScore",
        fmt_score(before.initial_score),
        fmt_score(after.initial_score),
    );
    push_if_changed(
        &mut changes,
        "reviewDate",
        fmt_date(before.review_date),
        fmt_date(after.review_date),
    );
    push_if_json_changed(&mut changes, "metadata", &before.metadata, &after.metadata);
    push_if_changed(
        &mut changes,
        "typeId",
        fmt_opt(before.type_id.as_deref()),
        fmt_opt(after.type_id.as_deref()),
    );
    push_if_changed(
        &mut changes,
        "scorecardId",
        before.scorecard_id.0.clone(),
        after.scorecard_id.0.clone(),
    );

    let question_ids: BTreeSet<_> = before
        .review_items
        .iter()
        .chain(after.review_items.iter())
        .map(|item| item.scorecard_question_id.clone())
        .collect();

    for question_id in question_ids {
        let old = before.item(&question_id);
        let new = after.item(&question_id);
        diff_item(&mut changes, &question_id.0, old, new);
    }

    changes
}

fn diff_item(changes: &mut Vec<String>, question: &str, old: Option<&ReviewItem>, new: Option<&ReviewItem>) {
    let old_initial = old.map(|item| item.initial_answer.as_str());
    let new_initial = new.map(|item| item.initial_answer.as_str());
    push_if_changed(
        changes,
        &format!("items[{question}].initialAnswer"),
        fmt_opt(old_initial),
        fmt_opt(new_initial),
    );

    let old_final = old.and_then(|item| item.final_answer.as_deref());
    let new_final = new.and_then(|item| item.final_answer.as_deref());
    push_if_changed(
        changes,
        &format!("items[{question}].finalAnswer"),
        fmt_opt(old_final),
        fmt_opt(new_final),
    );

    let old_comment = old.and_then(|item| item.manager_comment.as_deref());
    let new_comment = new.and_then(|item| item.manager_comment.as_deref());
    push_if_changed(
        changes,
        &format!("items[{question}].managerComment"),
        fmt_opt(old_comment),
        fmt_opt(new_comment),
    );
}

fn push_if_changed(
    changes: &mut Vec<String>,
    field: &str,
    before: impl AsRef<str>,
    after: impl AsRef<str>,
) {
    let before = before.as_ref();
    let after = after.as_ref();
    if before != after {
        changes.push(format!("{field}: {before} -> {after}"));
    }
}

// Structured values are deep-compared as JSON before declaring a change so
// equivalent orderings do not produce noise entries.
fn push_if_json_changed(
    changes: &mut Vec<String>,
    field: &str,
    before: &Option<Value>,
    after: &Option<Value>,
) {
    if before != after {
        changes.push(format!(
            "{field}: {} -> {}",
            fmt_json(before),
            fmt_json(after)
        ));
    }
}

fn fmt_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn fmt_opt(value: Option<&str>) -> String {
    match value {
        Some(text) => text.to_string(),
        None => "none".to_string(),
    }
}

fn fmt_score(value: Option<f64>) -> String {
    match value {
        Some(score) => format!("{score:.2}"),
        None => "none".to_string(),
    }
}

// Dates are canonicalized to RFC 3339 so representation differences do not
// register as changes.
fn fmt_date(value: Option<DateTime<Utc>>) -> String {
    match value {
        Some(date) => date.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => "none".to_string(),
    }
}

fn fmt_json(value: &Option<Value>) -> String {
    match value {
        Some(json) => json.to_string(),
        None => "none".to_string(),
    }
}
