use std::collections::BTreeMap;

use super::super::domain::{QuestionId, QuestionKind, ReviewItem, ScorecardQuestion, ScorecardTree};

/// Which answer chain a roll-up reads. The final chain falls back to the
/// initial answer when no final answer was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScoreChain {
    Initial,
    Final,
}

pub(crate) fn answers_by_question(items: &[ReviewItem]) -> BTreeMap<&QuestionId, &ReviewItem> {
    items
        .iter()
        .map(|item| (&item.scorecard_question_id, item))
        .collect()
}

fn chain_answer<'a>(item: &'a ReviewItem, chain: ScoreChain) -> &'a str {
    match chain {
        ScoreChain::Initial => &item.initial_answer,
        ScoreChain::Final => item.final_answer.as_deref().unwrap_or(&item.initial_answer),
    }
}

/// Score one question in [0,100]. Missing, malformed, and unscorable
/// answers all score zero but still consume their weight share upstream.
pub(crate) fn question_score(question: &ScorecardQuestion, answer: Option<&str>) -> f64 {
    let Some(answer) = answer else {
        return 0.0;
    };

    match question.kind {
        QuestionKind::YesNo => {
            if answer.trim().eq_ignore_ascii_case("yes") {
                100.0
            } else {
                0.0
            }
        }
        QuestionKind::Scale | QuestionKind::TestCase => {
            let min = question.scale_min.unwrap_or(0.0);
            let max = question.scale_max.unwrap_or(0.0);
            let span = max - min;
            if !(span > 0.0) {
                return 0.0;
            }
            match answer.trim().parse::<f64>() {
                // "NaN" and "inf" parse successfully but are not scorable answers.
                Ok(value) if value.is_finite() => (((value - min) / span) * 100.0).clamp(0.0, 100.0),
                _ => 0.0,
            }
        }
        QuestionKind::Other => 0.0,
    }
}

/// Weight-normalized average of sibling scores. A zero (or negative) weight
/// total falls back to an equal split so malformed scorecards never divide
/// by zero.
pub(crate) fn weighted_average(entries: &[(f64, f64)]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }

    let total: f64 = entries.iter().map(|(weight, _)| weight).sum();
    if total > 0.0 {
        entries
            .iter()
            .map(|(weight, score)| score * (weight / total))
            .sum()
    } else {
        let share = 1.0 / entries.len() as f64;
        entries.iter().map(|(_, score)| score * share).sum()
    }
}

/// Bottom-up three-level roll-up (question → section → group → overall)
/// for one answer chain.
pub(crate) fn aggregate_chain(tree: &ScorecardTree, items: &[ReviewItem], chain: ScoreChain) -> f64 {
    let answers = answers_by_question(items);

    let group_entries: Vec<(f64, f64)> = tree
        .groups
        .iter()
        .map(|group| {
            let section_entries: Vec<(f64, f64)> = group
                .sections
                .iter()
                .map(|section| {
                    let question_entries: Vec<(f64, f64)> = section
                        .questions
                        .iter()
                        .map(|question| {
                            let answer = answers
                                .get(&question.id)
                                .map(|item| chain_answer(item, chain));
                            (question.weight, question_score(question, answer))
                        })
                        .collect();
                    (section.weight, weighted_average(&question_entries))
                })
                .collect();
            (group.weight, weighted_average(&section_entries))
        })
        .collect();

    weighted_average(&group_entries)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
