use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attemptstatus", rename_all = "snake_case")]
pub(crate) enum AttemptStatus {
    InProgress,
    Finished,
    TimedOut,
}

impl AttemptStatus {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, AttemptStatus::Finished | AttemptStatus::TimedOut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum QuestionKind {
    Mcq,
    Tf,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

/// A free-form user answer. The wire format is untagged (`2`, `true`,
/// `"paris"`), the in-memory form is a closed sum so grading dispatch is
/// exhaustive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum AnswerValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl AnswerValue {
    /// Integer view used for choice-index answers. Accepts a whole number
    /// or numeric text; booleans never name a choice.
    pub(crate) fn as_index(&self) -> Option<i64> {
        match self {
            AnswerValue::Number(value) if value.fract() == 0.0 => Some(*value as i64),
            AnswerValue::Number(_) => None,
            AnswerValue::Bool(_) => None,
            AnswerValue::Text(text) => text.trim().parse::<i64>().ok(),
        }
    }

    /// Textual view used for tf/short grading.
    pub(crate) fn as_text(&self) -> String {
        match self {
            AnswerValue::Number(value) => {
                if value.fract() == 0.0 {
                    format!("{}", *value as i64)
                } else {
                    format!("{value}")
                }
            }
            AnswerValue::Bool(value) => value.to_string(),
            AnswerValue::Text(text) => text.clone(),
        }
    }
}
