use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{AnswerRecord, SnapshotQuestion};
use crate::db::types::{AnswerValue, AttemptStatus, DifficultyLevel, QuestionKind};
use crate::grading::GradedDetail;

/// Inbound answers, for both progress saves and explicit submits.
#[derive(Debug, Clone, Deserialize, Validate)]
pub(crate) struct SaveAnswersRequest {
    #[validate(nested)]
    pub(crate) answers: Vec<AnswerPayload>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub(crate) struct AnswerPayload {
    #[validate(length(min = 1, max = 128, message = "qid must be 1..128 characters"))]
    pub(crate) qid: String,
    pub(crate) user_answer: AnswerValue,
    #[serde(default)]
    pub(crate) time_taken_seconds: i64,
}

impl AnswerPayload {
    pub(crate) fn into_record(self) -> AnswerRecord {
        AnswerRecord {
            qid: self.qid,
            user_answer: self.user_answer,
            is_correct: None,
            time_taken_seconds: self.time_taken_seconds,
        }
    }
}

/// Question as a client is allowed to see it. The answer-key fields are
/// populated only for terminal attempts; an open attempt must never reveal
/// them.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) qid: String,
    pub(crate) kind: QuestionKind,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) prompt: String,
    pub(crate) choices: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) explanation: Option<String>,
}

impl QuestionView {
    pub(crate) fn client_safe(question: &SnapshotQuestion) -> Self {
        Self {
            qid: question.qid.clone(),
            kind: question.kind,
            difficulty: question.difficulty,
            prompt: question.prompt.clone(),
            choices: question.choices.clone(),
            correct_index: None,
            correct_text: None,
            explanation: None,
        }
    }

    pub(crate) fn revealed(question: &SnapshotQuestion) -> Self {
        Self {
            correct_index: question.correct_index,
            correct_text: question.correct_text.clone(),
            explanation: question.explanation.clone(),
            ..Self::client_safe(question)
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptStartedResponse {
    pub(crate) attempt_id: String,
    pub(crate) quiz_id: String,
    pub(crate) started_at: String,
    pub(crate) expires_at: Option<String>,
    pub(crate) total_questions: i32,
    pub(crate) questions: Vec<QuestionView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveProgressAck {
    pub(crate) attempt_id: String,
    pub(crate) answer_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReviewEntry {
    pub(crate) qid: String,
    pub(crate) is_correct: bool,
    pub(crate) expected_value: Option<String>,
    pub(crate) user_answer: Option<AnswerValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) similarity: Option<f64>,
    pub(crate) explanation: Option<String>,
}

impl From<GradedDetail> for ReviewEntry {
    fn from(detail: GradedDetail) -> Self {
        Self {
            qid: detail.qid,
            is_correct: detail.is_correct,
            expected_value: detail.expected_value,
            user_answer: detail.user_answer,
            similarity: detail.similarity,
            explanation: detail.explanation,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FinalizeResponse {
    pub(crate) attempt_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) score: i32,
    pub(crate) total_questions: i32,
    pub(crate) auto_submitted: bool,
    pub(crate) finished_at: String,
    pub(crate) review: Vec<ReviewEntry>,
}

/// Raw saved answer as echoed back to the client. Verdicts are carried by
/// the review, never here.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SavedAnswerView {
    pub(crate) qid: String,
    pub(crate) user_answer: AnswerValue,
    pub(crate) time_taken_seconds: i64,
}

impl From<&AnswerRecord> for SavedAnswerView {
    fn from(record: &AnswerRecord) -> Self {
        Self {
            qid: record.qid.clone(),
            user_answer: record.user_answer.clone(),
            time_taken_seconds: record.time_taken_seconds,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) user_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) expires_at: Option<String>,
    pub(crate) finished_at: Option<String>,
    pub(crate) auto_submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) score: Option<i32>,
    pub(crate) total_questions: i32,
    pub(crate) questions: Vec<QuestionView>,
    pub(crate) answers: Vec<SavedAnswerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) review: Option<Vec<ReviewEntry>>,
}
