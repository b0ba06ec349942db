use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::db::types::{AnswerValue, AttemptStatus, DifficultyLevel, QuestionKind};

/// Quiz definition as the authoring system persists it. Read-only input for
/// this crate; the attempt keeps its own snapshot of the questions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Quiz {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) questions: Json<Vec<QuizQuestion>>,
    pub(crate) start_at: Option<OffsetDateTime>,
    pub(crate) end_at: Option<OffsetDateTime>,
    pub(crate) duration_minutes: Option<i32>,
    pub(crate) shuffle_questions: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QuizQuestion {
    #[serde(default)]
    pub(crate) id: Option<String>,
    pub(crate) kind: QuestionKind,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) prompt: String,
    #[serde(default)]
    pub(crate) choices: Vec<String>,
    #[serde(default)]
    pub(crate) correct_index: Option<i64>,
    #[serde(default)]
    pub(crate) correct_text: Option<String>,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
}

/// Per-attempt copy of a question, frozen at start time. Grading reads this
/// snapshot even if the source quiz is edited afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SnapshotQuestion {
    pub(crate) qid: String,
    pub(crate) kind: QuestionKind,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) prompt: String,
    #[serde(default)]
    pub(crate) choices: Vec<String>,
    #[serde(default)]
    pub(crate) correct_index: Option<i64>,
    #[serde(default)]
    pub(crate) correct_text: Option<String>,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
}

/// One recorded answer. `is_correct` stays absent until the attempt is
/// finalized; a stored record must never leak a verdict earlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AnswerRecord {
    pub(crate) qid: String,
    pub(crate) user_answer: AnswerValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) is_correct: Option<bool>,
    #[serde(default)]
    pub(crate) time_taken_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) user_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: OffsetDateTime,
    pub(crate) expires_at: Option<OffsetDateTime>,
    pub(crate) finished_at: Option<OffsetDateTime>,
    pub(crate) auto_submitted: bool,
    pub(crate) question_snapshot: Json<Vec<SnapshotQuestion>>,
    pub(crate) answers: Json<Vec<AnswerRecord>>,
    pub(crate) score: i32,
    pub(crate) total_questions: i32,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl Attempt {
    pub(crate) fn answer_for(&self, qid: &str) -> Option<&AnswerRecord> {
        self.answers.0.iter().find(|record| record.qid == qid)
    }

    pub(crate) fn deadline_passed(&self, now: OffsetDateTime) -> bool {
        self.expires_at.map(|deadline| now >= deadline).unwrap_or(false)
    }
}
