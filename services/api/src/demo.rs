use clap::Args;
use review_engine::config::PhaseConfig;
use review_engine::error::AppError;
use review_engine::reviews::{
    Actor, ChallengeId, PhaseId, QuestionId, ResourceId, ReviewDraft, ReviewItemDraft,
    ReviewItemPatch, ReviewPatch, ReviewStatus, ScorecardId, SubmissionId,
};

use crate::infra::{
    seeded_service, DEMO_CHALLENGE, DEMO_COPILOT, DEMO_REVIEWER, DEMO_REVIEWER_RESOURCE,
    DEMO_REVIEW_PHASE, DEMO_SCORECARD, DEMO_SUBMISSION, DEMO_SUBMITTER,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the copilot score-override portion of the demo.
    #[arg(long)]
    pub(crate) skip_override: bool,
}

fn score_label(score: Option<f64>) -> String {
    score
        .map(|value| format!("{value:.2}"))
        .unwrap_or_else(|| "unscored".to_string())
}

fn item(question: &str, answer: &str) -> ReviewItemDraft {
    ReviewItemDraft {
        scorecard_question_id: QuestionId(question.to_string()),
        initial_answer: answer.to_string(),
        final_answer: None,
        manager_comment: None,
        comments: Vec::new(),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let seeded = seeded_service(PhaseConfig::default());
    let service = seeded.service;

    let reviewer = Actor::member(DEMO_REVIEWER);
    let copilot = Actor::member(DEMO_COPILOT);
    let submitter = Actor::member(DEMO_SUBMITTER);

    println!("Challenge review lifecycle demo");
    println!(
        "- Challenge {DEMO_CHALLENGE}: review phase open, scorecard {DEMO_SCORECARD} seeded"
    );

    let review = match service.create_review(
        &reviewer,
        ReviewDraft {
            challenge_id: ChallengeId(DEMO_CHALLENGE.to_string()),
            resource_id: ResourceId(DEMO_REVIEWER_RESOURCE.to_string()),
            submission_id: Some(SubmissionId(DEMO_SUBMISSION.to_string())),
            scorecard_id: ScorecardId(DEMO_SCORECARD.to_string()),
            phase_id: PhaseId(DEMO_REVIEW_PHASE.to_string()),
            type_id: None,
            metadata: None,
            submitter_handle: Some(DEMO_SUBMITTER.to_string()),
            submitter_max_rating: Some(1900),
        },
    ) {
        Ok(review) => review,
        Err(err) => {
            println!("  Review creation rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- {DEMO_REVIEWER} opened review {} for submission {DEMO_SUBMISSION}",
        review.id.0
    );

    let review = match service.set_review_items(
        &reviewer,
        &review.id,
        vec![
            item("q-functional", "3"),
            item("q-tests", "yes"),
            item("q-docs", "no"),
        ],
    ) {
        Ok(review) => review,
        Err(err) => {
            println!("  Scorecard answers rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- Answers recorded; aggregated initial score {}",
        score_label(review.initial_score)
    );

    match service.get_review(&submitter, &review.id) {
        Ok(visible) => println!(
            "- {DEMO_SUBMITTER} read the review early (score {})",
            score_label(visible.final_score)
        ),
        Err(err) => println!("- {DEMO_SUBMITTER} read attempt while review is open: {err}"),
    }

    let review = match service.update_review(
        &reviewer,
        &review.id,
        ReviewPatch::status(ReviewStatus::Completed),
    ) {
        Ok(review) => review,
        Err(err) => {
            println!("  Completion rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- Review completed at {}; final score {}",
        review
            .review_date
            .map(|date| date.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string()),
        score_label(review.final_score)
    );
    for event in seeded.events.events() {
        println!("  Event published: {} -> {}", event.topic, event.review_id.0);
    }

    if args.skip_override {
        return Ok(());
    }

    println!("\nCopilot score override (audited)");
    let review = match service.update_review_item(
        &copilot,
        &review.id,
        &QuestionId("q-docs".to_string()),
        ReviewItemPatch {
            final_answer: Some("yes".to_string()),
            manager_comment: Some("documentation added during appeals".to_string()),
            ..ReviewItemPatch::default()
        },
    ) {
        Ok(review) => review,
        Err(err) => {
            println!("  Override rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- Final score recomputed: initial {} / final {}",
        score_label(review.initial_score),
        score_label(review.final_score)
    );

    let entries = seeded.audit.entries();
    if entries.is_empty() {
        println!("- Audit log: empty");
    } else {
        println!("- Audit log:");
        for entry in entries {
            println!("    [{}] {}", entry.actor, entry.description);
        }
    }

    Ok(())
}
