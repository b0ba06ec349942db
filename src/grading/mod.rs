//! Pure answer-grading engine. No I/O, no shared state: one function scores
//! a single answer against its question, another aggregates a whole attempt
//! in snapshot order.

pub(crate) mod numbers;
pub(crate) mod text;

use std::collections::HashMap;

use serde::Serialize;

use crate::db::models::SnapshotQuestion;
use crate::db::types::{AnswerValue, QuestionKind};

pub(crate) const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;
pub(crate) const DEFAULT_NUMERIC_TOLERANCE: f64 = 1e-9;

/// Tunable matching policy. The defaults are the product's stock behavior;
/// both knobs come from `Settings` at runtime.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GradingPolicy {
    pub(crate) fuzzy_threshold: f64,
    pub(crate) numeric_tolerance: f64,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            numeric_tolerance: DEFAULT_NUMERIC_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionGrade {
    pub(crate) is_correct: bool,
    pub(crate) expected_value: Option<String>,
    /// Set only when the fuzzy tier ran, for diagnostics.
    pub(crate) similarity: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GradedDetail {
    pub(crate) qid: String,
    pub(crate) is_correct: bool,
    pub(crate) expected_value: Option<String>,
    pub(crate) user_answer: Option<AnswerValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) similarity: Option<f64>,
    pub(crate) explanation: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct GradingReport {
    pub(crate) total_correct: i32,
    pub(crate) details: Vec<GradedDetail>,
}

/// The value a grader compares against, rendered for review screens: the
/// correct choice text for mcq, the expected text otherwise.
pub(crate) fn expected_value(question: &SnapshotQuestion) -> Option<String> {
    match question.kind {
        QuestionKind::Mcq => question
            .correct_index
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| question.choices.get(index).cloned()),
        QuestionKind::Tf | QuestionKind::Short => question.correct_text.clone(),
    }
}

pub(crate) fn grade_question(
    question: &SnapshotQuestion,
    answer: Option<&AnswerValue>,
    policy: &GradingPolicy,
) -> QuestionGrade {
    let expected = expected_value(question);

    let Some(answer) = answer else {
        return QuestionGrade { is_correct: false, expected_value: expected, similarity: None };
    };

    match question.kind {
        QuestionKind::Mcq => {
            let is_correct = match (question.correct_index, answer.as_index()) {
                (Some(correct), Some(given)) => correct == given,
                _ => false,
            };
            QuestionGrade { is_correct, expected_value: expected, similarity: None }
        }
        QuestionKind::Tf => {
            let is_correct = question
                .correct_text
                .as_deref()
                .map(|correct| grade_true_false(correct, &answer.as_text()))
                .unwrap_or(false);
            QuestionGrade { is_correct, expected_value: expected, similarity: None }
        }
        QuestionKind::Short => match question.correct_text.as_deref() {
            Some(correct) => grade_short(correct, &answer.as_text(), expected, policy),
            None => QuestionGrade { is_correct: false, expected_value: expected, similarity: None },
        },
    }
}

/// Two-tier true/false matching: boolean equivalents when both sides map,
/// plain normalized equality otherwise. Unmapped tokens ("maybe") must not
/// silently become `false` and accidentally match.
fn grade_true_false(correct: &str, given: &str) -> bool {
    let correct_norm = text::normalize(correct);
    let given_norm = text::normalize(given);

    match (text::as_boolean(&correct_norm), text::as_boolean(&given_norm)) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => correct_norm == given_norm,
    }
}

/// Three-tier short-answer matching, first success wins: exact token,
/// numeric equivalence, fuzzy similarity.
fn grade_short(
    correct: &str,
    given: &str,
    expected: Option<String>,
    policy: &GradingPolicy,
) -> QuestionGrade {
    if !correct.trim().is_empty() && text::first_token(correct) == text::first_token(given) {
        return QuestionGrade { is_correct: true, expected_value: expected, similarity: None };
    }

    if let (Some(correct_number), Some(given_number)) =
        (numbers::parse_number(correct), numbers::parse_number(given))
    {
        if (correct_number - given_number).abs() <= policy.numeric_tolerance {
            return QuestionGrade { is_correct: true, expected_value: expected, similarity: None };
        }
    }

    let similarity = text::similarity(&text::normalize(correct), &text::normalize(given));
    QuestionGrade {
        is_correct: similarity >= policy.fuzzy_threshold,
        expected_value: expected,
        similarity: Some(similarity),
    }
}

/// Grade a whole attempt. Iterates the snapshot in its stored order (not
/// answer-submission order); a question with no recorded answer is graded
/// incorrect. The details carry everything a review screen needs.
pub(crate) fn grade_all(
    questions: &[SnapshotQuestion],
    answers_by_qid: &HashMap<&str, &AnswerValue>,
    policy: &GradingPolicy,
) -> GradingReport {
    let mut total_correct = 0;
    let mut details = Vec::with_capacity(questions.len());

    for question in questions {
        let answer = answers_by_qid.get(question.qid.as_str()).copied();
        let grade = grade_question(question, answer, policy);
        if grade.is_correct {
            total_correct += 1;
        }
        details.push(GradedDetail {
            qid: question.qid.clone(),
            is_correct: grade.is_correct,
            expected_value: grade.expected_value,
            user_answer: answer.cloned(),
            similarity: grade.similarity,
            explanation: question.explanation.clone(),
        });
    }

    GradingReport { total_correct, details }
}
