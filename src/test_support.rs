use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::types::Json;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use crate::core::time::Clock;
use crate::db::models::{AnswerRecord, Attempt, Quiz, QuizQuestion};
use crate::db::types::{AttemptStatus, DifficultyLevel, QuestionKind};
use crate::grading::GradingPolicy;
use crate::services::attempts::AttemptService;
use crate::services::catalog::QuizCatalog;
use crate::services::stats::{StatsDelta, StatsSink};
use crate::services::Identity;
use crate::store::{AttemptStore, FinalizeRecord, StoreError};
use crate::tasks::sweeper::ExpirySweeper;

pub(crate) const BASE_TIME: OffsetDateTime = datetime!(2025-06-01 10:00 UTC);

/// Clock whose hands only move when a test pushes them.
pub(crate) struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub(crate) fn at(now: OffsetDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("clock lock")
    }
}

/// In-memory `AttemptStore` with the same conditional-update semantics as
/// the Postgres implementation. `poison_finalize` injects a backend failure
/// for one attempt id, for batch-isolation tests.
#[derive(Default)]
pub(crate) struct MemoryAttemptStore {
    attempts: Mutex<HashMap<String, Attempt>>,
    poisoned_finalize: Mutex<HashSet<String>>,
}

impl MemoryAttemptStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, id: &str) -> Option<Attempt> {
        self.attempts.lock().expect("store lock").get(id).cloned()
    }

    pub(crate) fn poison_finalize(&self, id: &str) {
        self.poisoned_finalize.lock().expect("store lock").insert(id.to_string());
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn insert(&self, attempt: Attempt) -> Result<bool, StoreError> {
        let mut attempts = self.attempts.lock().expect("store lock");
        if attempts.contains_key(&attempt.id) {
            return Ok(false);
        }
        attempts.insert(attempt.id.clone(), attempt);
        Ok(true)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Attempt>, StoreError> {
        Ok(self.get(id))
    }

    async fn has_finished_attempt(
        &self,
        quiz_id: &str,
        user_id: &str,
    ) -> Result<bool, StoreError> {
        let attempts = self.attempts.lock().expect("store lock");
        Ok(attempts.values().any(|attempt| {
            attempt.quiz_id == quiz_id
                && attempt.user_id == user_id
                && attempt.status == AttemptStatus::Finished
        }))
    }

    async fn save_answers_if_in_progress(
        &self,
        id: &str,
        answers: Vec<AnswerRecord>,
        now: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let mut attempts = self.attempts.lock().expect("store lock");
        match attempts.get_mut(id) {
            Some(attempt) if attempt.status == AttemptStatus::InProgress => {
                attempt.answers = Json(answers);
                attempt.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn finalize_if_in_progress(
        &self,
        id: &str,
        record: FinalizeRecord,
    ) -> Result<bool, StoreError> {
        if self.poisoned_finalize.lock().expect("store lock").contains(id) {
            return Err(StoreError::Backend("injected finalize failure".to_string()));
        }

        let mut attempts = self.attempts.lock().expect("store lock");
        match attempts.get_mut(id) {
            Some(attempt) if attempt.status == AttemptStatus::InProgress => {
                attempt.status = record.status;
                attempt.finished_at = Some(record.finished_at);
                attempt.auto_submitted = record.auto_submitted;
                attempt.answers = Json(record.answers);
                attempt.score = record.score;
                attempt.updated_at = record.finished_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_expired(
        &self,
        now: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<Attempt>, StoreError> {
        let attempts = self.attempts.lock().expect("store lock");
        let mut overdue: Vec<Attempt> = attempts
            .values()
            .filter(|attempt| {
                attempt.status == AttemptStatus::InProgress
                    && attempt.expires_at.map(|deadline| deadline <= now).unwrap_or(false)
            })
            .cloned()
            .collect();
        overdue.sort_by_key(|attempt| attempt.expires_at);
        overdue.truncate(limit.max(0) as usize);
        Ok(overdue)
    }
}

pub(crate) struct MemoryQuizCatalog {
    quizzes: HashMap<String, Quiz>,
}

impl MemoryQuizCatalog {
    pub(crate) fn new(quizzes: Vec<Quiz>) -> Self {
        Self { quizzes: quizzes.into_iter().map(|quiz| (quiz.id.clone(), quiz)).collect() }
    }
}

#[async_trait]
impl QuizCatalog for MemoryQuizCatalog {
    async fn find_by_id(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError> {
        Ok(self.quizzes.get(quiz_id).cloned())
    }
}

#[derive(Default)]
pub(crate) struct MemoryStatsSink {
    deltas: Mutex<Vec<StatsDelta>>,
    failing: AtomicBool,
}

impl MemoryStatsSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn recorded(&self) -> Vec<StatsDelta> {
        self.deltas.lock().expect("stats lock").clone()
    }
}

#[async_trait]
impl StatsSink for MemoryStatsSink {
    async fn increment(&self, delta: StatsDelta) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("stats store unavailable".to_string()));
        }
        self.deltas.lock().expect("stats lock").push(delta);
        Ok(())
    }
}

pub(crate) struct TestContext {
    pub(crate) service: AttemptService,
    pub(crate) store: Arc<MemoryAttemptStore>,
    pub(crate) stats: Arc<MemoryStatsSink>,
    pub(crate) clock: Arc<ManualClock>,
}

pub(crate) fn setup(quizzes: Vec<Quiz>) -> TestContext {
    let store = Arc::new(MemoryAttemptStore::new());
    let stats = Arc::new(MemoryStatsSink::new());
    let clock = Arc::new(ManualClock::at(BASE_TIME));

    let service = AttemptService::new(
        Arc::clone(&store) as Arc<dyn AttemptStore>,
        Arc::new(MemoryQuizCatalog::new(quizzes)),
        Arc::clone(&stats) as Arc<dyn StatsSink>,
        Arc::clone(&clock) as Arc<dyn Clock>,
        GradingPolicy::default(),
    );

    TestContext { service, store, stats, clock }
}

impl TestContext {
    pub(crate) fn sweeper(&self, batch_size: i64) -> ExpirySweeper {
        ExpirySweeper::new(
            self.service.clone(),
            Arc::clone(&self.store) as Arc<dyn AttemptStore>,
            Arc::clone(&self.clock) as Arc<dyn Clock>,
            batch_size,
        )
    }
}

pub(crate) fn identity(user_id: &str) -> Identity {
    Identity { user_id: user_id.to_string(), display_name: format!("User {user_id}") }
}

pub(crate) fn mcq_question(id: &str, choices: &[&str], correct_index: i64) -> QuizQuestion {
    QuizQuestion {
        id: Some(id.to_string()),
        kind: QuestionKind::Mcq,
        difficulty: DifficultyLevel::Easy,
        prompt: format!("choose wisely ({id})"),
        choices: choices.iter().map(|choice| choice.to_string()).collect(),
        correct_index: Some(correct_index),
        correct_text: None,
        explanation: Some(format!("explanation for {id}")),
    }
}

pub(crate) fn tf_question(id: &str, correct: &str) -> QuizQuestion {
    QuizQuestion {
        id: Some(id.to_string()),
        kind: QuestionKind::Tf,
        difficulty: DifficultyLevel::Easy,
        prompt: format!("true or false ({id})"),
        choices: Vec::new(),
        correct_index: None,
        correct_text: Some(correct.to_string()),
        explanation: None,
    }
}

pub(crate) fn short_question(id: &str, correct: &str) -> QuizQuestion {
    QuizQuestion {
        id: Some(id.to_string()),
        kind: QuestionKind::Short,
        difficulty: DifficultyLevel::Medium,
        prompt: format!("answer freely ({id})"),
        choices: Vec::new(),
        correct_index: None,
        correct_text: Some(correct.to_string()),
        explanation: Some(format!("explanation for {id}")),
    }
}

pub(crate) fn quiz(id: &str, questions: Vec<QuizQuestion>) -> Quiz {
    Quiz {
        id: id.to_string(),
        title: format!("Quiz {id}"),
        description: None,
        questions: Json(questions),
        start_at: None,
        end_at: None,
        duration_minutes: None,
        shuffle_questions: false,
        created_by: "author-1".to_string(),
        created_at: BASE_TIME,
        updated_at: BASE_TIME,
    }
}

/// The stock three-question quiz used across service tests: an mcq with
/// correct index 2, a tf expecting "true", and a short expecting "5".
pub(crate) fn sample_quiz(id: &str) -> Quiz {
    quiz(
        id,
        vec![
            mcq_question("m1", &["A", "B", "C", "D"], 2),
            tf_question("t1", "true"),
            short_question("s1", "5"),
        ],
    )
}
