use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::seq::SliceRandom;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;
use validator::Validate;

use crate::core::time::{format_offset, Clock};
use crate::db::models::{AnswerRecord, Attempt, Quiz, SnapshotQuestion};
use crate::db::types::AttemptStatus;
use crate::grading::{self, GradingPolicy};
use crate::schemas::attempt::{
    AttemptResponse, AttemptStartedResponse, FinalizeResponse, QuestionView, ReviewEntry,
    SaveAnswersRequest, SaveProgressAck, SavedAnswerView,
};
use crate::services::catalog::QuizCatalog;
use crate::services::errors::AttemptError;
use crate::services::stats::{self, StatsDelta, StatsSink};
use crate::services::{FinalizeTrigger, Identity};
use crate::store::{AttemptStore, FinalizeRecord};


/// The session manager: owns the attempt state machine and calls the
/// grading engine at every transition out of `in_progress`.
#[derive(Clone)]
pub(crate) struct AttemptService {
    store: Arc<dyn AttemptStore>,
    catalog: Arc<dyn QuizCatalog>,
    stats: Arc<dyn StatsSink>,
    clock: Arc<dyn Clock>,
    policy: GradingPolicy,
}

impl AttemptService {
    pub(crate) fn new(
        store: Arc<dyn AttemptStore>,
        catalog: Arc<dyn QuizCatalog>,
        stats: Arc<dyn StatsSink>,
        clock: Arc<dyn Clock>,
        policy: GradingPolicy,
    ) -> Self {
        Self { store, catalog, stats, clock, policy }
    }

    pub(crate) async fn start_attempt(
        &self,
        quiz_id: &str,
        caller: &Identity,
    ) -> Result<AttemptStartedResponse, AttemptError> {
        let quiz = self
            .catalog
            .find_by_id(quiz_id)
            .await
            .map_err(|e| AttemptError::dependency(e, "Failed to fetch quiz"))?
            .ok_or_else(|| AttemptError::NotFound("Quiz not found".to_string()))?;

        let now = self.clock.now();
        if let Some(start_at) = quiz.start_at {
            if now < start_at {
                return Err(AttemptError::PolicyViolation("Quiz has not opened yet".to_string()));
            }
        }
        if let Some(end_at) = quiz.end_at {
            if now > end_at {
                return Err(AttemptError::PolicyViolation("Quiz has closed".to_string()));
            }
        }

        // Single-attempt policy. Check-then-create: a concurrent duplicate
        // start can slip through the gap (see DESIGN.md).
        let already_finished = self
            .store
            .has_finished_attempt(quiz_id, &caller.user_id)
            .await
            .map_err(|e| AttemptError::dependency(e, "Failed to check previous attempts"))?;
        if already_finished {
            return Err(AttemptError::Forbidden("Quiz was already completed"));
        }

        let snapshot = build_snapshot(&quiz);
        let expires_at = compute_deadline(now, quiz.duration_minutes, quiz.end_at);
        let total_questions = snapshot.len() as i32;

        let attempt_id = Uuid::new_v4().to_string();
        let attempt = Attempt {
            id: attempt_id.clone(),
            quiz_id: quiz.id.clone(),
            user_id: caller.user_id.clone(),
            status: AttemptStatus::InProgress,
            started_at: now,
            expires_at,
            finished_at: None,
            auto_submitted: false,
            question_snapshot: sqlx::types::Json(snapshot),
            answers: sqlx::types::Json(Vec::new()),
            score: 0,
            total_questions,
            created_at: now,
            updated_at: now,
        };

        let questions = attempt.question_snapshot.0.iter().map(QuestionView::client_safe).collect();

        let inserted = self
            .store
            .insert(attempt)
            .await
            .map_err(|e| AttemptError::dependency(e, "Failed to create attempt"))?;
        if !inserted {
            return Err(AttemptError::Conflict("Attempt already exists".to_string()));
        }

        tracing::info!(
            attempt_id = %attempt_id,
            quiz_id = %quiz.id,
            user_id = %caller.user_id,
            user = %caller.display_name,
            total_questions,
            "Attempt started"
        );
        metrics::counter!("attempts_started_total").increment(1);

        Ok(AttemptStartedResponse {
            attempt_id,
            quiz_id: quiz.id,
            started_at: format_offset(now),
            expires_at: expires_at.map(format_offset),
            total_questions,
            questions,
        })
    }

    pub(crate) async fn save_progress(
        &self,
        attempt_id: &str,
        caller: &Identity,
        payload: SaveAnswersRequest,
    ) -> Result<SaveProgressAck, AttemptError> {
        let attempt = self.fetch_owned(attempt_id, caller).await?;
        if attempt.status != AttemptStatus::InProgress {
            return Err(AttemptError::Conflict("Attempt is no longer in progress".to_string()));
        }

        validate_payload(&payload)?;
        check_known_qids(&attempt.question_snapshot.0, &payload)?;

        let incoming: Vec<AnswerRecord> =
            payload.answers.into_iter().map(|answer| answer.into_record()).collect();
        let merged = merge_answers(attempt.answers.0, incoming);
        let answer_count = merged.len();

        let applied = self
            .store
            .save_answers_if_in_progress(attempt_id, merged, self.clock.now())
            .await
            .map_err(|e| AttemptError::dependency(e, "Failed to save progress"))?;
        if !applied {
            return Err(AttemptError::Conflict(
                "Attempt was finalized while saving progress".to_string(),
            ));
        }

        tracing::debug!(attempt_id, answer_count, "Progress saved");

        Ok(SaveProgressAck { attempt_id: attempt_id.to_string(), answer_count })
    }

    pub(crate) async fn finalize(
        &self,
        attempt_id: &str,
        supplied: Option<SaveAnswersRequest>,
        trigger: FinalizeTrigger<'_>,
    ) -> Result<FinalizeResponse, AttemptError> {
        let attempt = match trigger {
            FinalizeTrigger::User(caller) => self.fetch_owned(attempt_id, caller).await?,
            FinalizeTrigger::Expiry => self.fetch(attempt_id).await?,
        };
        if attempt.status != AttemptStatus::InProgress {
            return Err(AttemptError::Conflict("Attempt was already finalized".to_string()));
        }

        let now = self.clock.now();
        if matches!(trigger, FinalizeTrigger::Expiry) && !attempt.deadline_passed(now) {
            return Err(AttemptError::Conflict("Attempt deadline has not passed".to_string()));
        }

        // A late explicit submit is still an auto-submit: the flag follows
        // the deadline, not the trigger.
        let auto_submitted = attempt.deadline_passed(now);
        let status = match trigger {
            FinalizeTrigger::User(_) => AttemptStatus::Finished,
            FinalizeTrigger::Expiry => AttemptStatus::TimedOut,
        };

        let mut merged = attempt.answers.0.clone();
        if let Some(supplied) = supplied {
            validate_payload(&supplied)?;
            check_known_qids(&attempt.question_snapshot.0, &supplied)?;
            let incoming: Vec<AnswerRecord> =
                supplied.answers.into_iter().map(|answer| answer.into_record()).collect();
            merged = merge_answers(merged, incoming);
        }

        let report = {
            let answers_by_qid: HashMap<&str, &crate::db::types::AnswerValue> =
                merged.iter().map(|record| (record.qid.as_str(), &record.user_answer)).collect();
            grading::grade_all(&attempt.question_snapshot.0, &answers_by_qid, &self.policy)
        };

        let verdicts: HashMap<&str, bool> =
            report.details.iter().map(|detail| (detail.qid.as_str(), detail.is_correct)).collect();
        for record in &mut merged {
            record.is_correct = Some(verdicts.get(record.qid.as_str()).copied().unwrap_or(false));
        }

        let finalized = self
            .store
            .finalize_if_in_progress(
                attempt_id,
                FinalizeRecord {
                    status,
                    finished_at: now,
                    auto_submitted,
                    answers: merged,
                    score: report.total_correct,
                },
            )
            .await
            .map_err(|e| AttemptError::dependency(e, "Failed to finalize attempt"))?;
        if !finalized {
            return Err(AttemptError::Conflict(
                "Attempt was finalized by a concurrent request".to_string(),
            ));
        }

        stats::dispatch_increment(
            Arc::clone(&self.stats),
            StatsDelta {
                user_id: attempt.user_id.clone(),
                score_delta: report.total_correct as i64,
                attempt_delta: 1,
            },
        );

        let trigger_label = match trigger {
            FinalizeTrigger::User(_) => "user",
            FinalizeTrigger::Expiry => "expiry",
        };
        tracing::info!(
            attempt_id,
            quiz_id = %attempt.quiz_id,
            user_id = %attempt.user_id,
            score = report.total_correct,
            total_questions = attempt.total_questions,
            auto_submitted,
            trigger = trigger_label,
            "Attempt finalized"
        );
        metrics::counter!("attempts_finalized_total", "trigger" => trigger_label).increment(1);

        Ok(FinalizeResponse {
            attempt_id: attempt_id.to_string(),
            status,
            score: report.total_correct,
            total_questions: attempt.total_questions,
            auto_submitted,
            finished_at: format_offset(now),
            review: report.details.into_iter().map(ReviewEntry::from).collect(),
        })
    }

    pub(crate) async fn read_attempt(
        &self,
        attempt_id: &str,
        caller: &Identity,
    ) -> Result<AttemptResponse, AttemptError> {
        let attempt = self.fetch_owned(attempt_id, caller).await?;
        let terminal = attempt.status.is_terminal();

        let questions = attempt
            .question_snapshot
            .0
            .iter()
            .map(|question| {
                if terminal {
                    QuestionView::revealed(question)
                } else {
                    QuestionView::client_safe(question)
                }
            })
            .collect();

        let review = terminal.then(|| {
            attempt
                .question_snapshot
                .0
                .iter()
                .map(|question| {
                    let record = attempt.answer_for(&question.qid);
                    ReviewEntry {
                        qid: question.qid.clone(),
                        is_correct: record.and_then(|r| r.is_correct).unwrap_or(false),
                        expected_value: grading::expected_value(question),
                        user_answer: record.map(|r| r.user_answer.clone()),
                        similarity: None,
                        explanation: question.explanation.clone(),
                    }
                })
                .collect::<Vec<_>>()
        });

        Ok(AttemptResponse {
            id: attempt.id,
            quiz_id: attempt.quiz_id,
            user_id: attempt.user_id,
            status: attempt.status,
            started_at: format_offset(attempt.started_at),
            expires_at: attempt.expires_at.map(format_offset),
            finished_at: attempt.finished_at.map(format_offset),
            auto_submitted: attempt.auto_submitted,
            score: terminal.then_some(attempt.score),
            total_questions: attempt.total_questions,
            questions,
            answers: attempt.answers.0.iter().map(SavedAnswerView::from).collect(),
            review,
        })
    }

    async fn fetch(&self, attempt_id: &str) -> Result<Attempt, AttemptError> {
        self.store
            .find_by_id(attempt_id)
            .await
            .map_err(|e| AttemptError::dependency(e, "Failed to fetch attempt"))?
            .ok_or_else(|| AttemptError::NotFound("Attempt not found".to_string()))
    }

    async fn fetch_owned(
        &self,
        attempt_id: &str,
        caller: &Identity,
    ) -> Result<Attempt, AttemptError> {
        let attempt = self.fetch(attempt_id).await?;
        if attempt.user_id != caller.user_id {
            return Err(AttemptError::Forbidden("Access denied"));
        }
        Ok(attempt)
    }
}

/// Freeze the quiz's questions into the attempt. Qids are assigned from the
/// source ids (positional fallback) before any shuffle, so they stay stable
/// across the attempt's lifetime.
fn build_snapshot(quiz: &Quiz) -> Vec<SnapshotQuestion> {
    let mut snapshot: Vec<SnapshotQuestion> = quiz
        .questions
        .0
        .iter()
        .enumerate()
        .map(|(index, question)| SnapshotQuestion {
            qid: question
                .id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("q{}", index + 1)),
            kind: question.kind,
            difficulty: question.difficulty,
            prompt: question.prompt.clone(),
            choices: question.choices.clone(),
            correct_index: question.correct_index,
            correct_text: question.correct_text.clone(),
            explanation: question.explanation.clone(),
        })
        .collect();

    if quiz.shuffle_questions {
        snapshot.shuffle(&mut rand::thread_rng());
    }

    snapshot
}

/// Attempt deadline: started-at plus the configured duration, never past
/// the quiz window; a window end alone still bounds the attempt. Both
/// absent means unlimited.
fn compute_deadline(
    started_at: OffsetDateTime,
    duration_minutes: Option<i32>,
    end_at: Option<OffsetDateTime>,
) -> Option<OffsetDateTime> {
    match (duration_minutes, end_at) {
        (Some(minutes), Some(end)) => {
            let candidate = started_at + Duration::minutes(minutes as i64);
            Some(if candidate < end { candidate } else { end })
        }
        (Some(minutes), None) => Some(started_at + Duration::minutes(minutes as i64)),
        (None, Some(end)) => Some(end),
        (None, None) => None,
    }
}

/// Last-write-wins merge per question: an incoming answer fully replaces
/// the saved one for that qid, everything else is untouched.
fn merge_answers(existing: Vec<AnswerRecord>, incoming: Vec<AnswerRecord>) -> Vec<AnswerRecord> {
    let mut merged = existing;
    for answer in incoming {
        match merged.iter_mut().find(|record| record.qid == answer.qid) {
            Some(record) => *record = answer,
            None => merged.push(answer),
        }
    }
    merged
}

fn validate_payload(payload: &SaveAnswersRequest) -> Result<(), AttemptError> {
    if payload.answers.is_empty() {
        return Err(AttemptError::InvalidInput("answers must not be empty".to_string()));
    }
    payload.validate().map_err(|e| AttemptError::InvalidInput(e.to_string()))
}

fn check_known_qids(
    snapshot: &[SnapshotQuestion],
    payload: &SaveAnswersRequest,
) -> Result<(), AttemptError> {
    let known: HashSet<&str> = snapshot.iter().map(|question| question.qid.as_str()).collect();
    for answer in &payload.answers {
        if !known.contains(answer.qid.as_str()) {
            return Err(AttemptError::InvalidInput(format!(
                "unknown question id: {}",
                answer.qid
            )));
        }
    }
    Ok(())
}
