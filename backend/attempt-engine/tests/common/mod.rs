#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use attempt_engine::{
    config::{Config, EngineSettings, GradingApiSettings},
    create_router,
    engine::{AttemptHandle, SessionSettings},
    models::{
        AnswerEntry, Attempt, AttemptStatus, AttemptView, GradedSummary, Question, QuestionType,
        QuizPaper, StartedAttempt,
    },
    services::{grading_client::GradingApi, AppState},
};
use axum::Router;
use chrono::{DateTime, Utc};

pub const QUIZ_ID: &str = "rust-basics";

/// In-memory grading collaborator that records every call.
pub struct FakeGradingApi {
    pub paper: Mutex<QuizPaper>,
    pub status: Mutex<AttemptStatus>,
    pub fail_questions: AtomicBool,
    pub failing_submits: AtomicUsize,
    pub submit_delay: Mutex<Duration>,
    pub start_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub submitted: Mutex<Vec<(String, Vec<AnswerEntry>)>>,
}

impl FakeGradingApi {
    pub fn new(time_limit_seconds: u32) -> Arc<Self> {
        Arc::new(Self {
            paper: Mutex::new(paper(time_limit_seconds)),
            status: Mutex::new(AttemptStatus::default()),
            fail_questions: AtomicBool::new(false),
            failing_submits: AtomicUsize::new(0),
            submit_delay: Mutex::new(Duration::ZERO),
            start_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn continue_attempt(&self, attempt_id: &str, started_at: Option<DateTime<Utc>>) {
        *self.status.lock().unwrap() = AttemptStatus {
            can_continue: true,
            attempt_id: Some(attempt_id.to_string()),
            started_at,
        };
    }

    pub fn fail_next_submits(&self, count: usize) {
        self.failing_submits.store(count, Ordering::SeqCst);
    }

    pub fn delay_submits(&self, delay: Duration) {
        *self.submit_delay.lock().unwrap() = delay;
    }

    pub fn submit_count(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn start_count(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn last_submitted(&self) -> Option<Vec<AnswerEntry>> {
        self.submitted
            .lock()
            .unwrap()
            .last()
            .map(|(_, answers)| answers.clone())
    }
}

#[async_trait]
impl GradingApi for FakeGradingApi {
    async fn fetch_questions(&self, quiz_id: &str) -> Result<QuizPaper> {
        if self.fail_questions.load(Ordering::SeqCst) {
            return Err(anyhow!("Grading API returned error 503: unavailable"));
        }
        let paper = self.paper.lock().unwrap().clone();
        if paper.quiz_id != quiz_id {
            return Err(anyhow!("Grading API returned error 404: quiz not found"));
        }
        Ok(paper)
    }

    async fn start_attempt(&self, _quiz_id: &str) -> Result<StartedAttempt> {
        let n = self.start_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(StartedAttempt {
            attempt_id: format!("attempt-{}", n),
            started_at: Utc::now(),
        })
    }

    async fn get_attempt_status(&self, _quiz_id: &str) -> Result<AttemptStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.status.lock().unwrap().clone())
    }

    async fn submit_attempt(
        &self,
        attempt_id: &str,
        answers: &[AnswerEntry],
    ) -> Result<GradedSummary> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted
            .lock()
            .unwrap()
            .push((attempt_id.to_string(), answers.to_vec()));

        let delay = *self.submit_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failing = self.failing_submits.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_submits.store(failing - 1, Ordering::SeqCst);
            return Err(anyhow!("Failed to submit attempt: connection reset"));
        }

        Ok(GradedSummary {
            score: 100.0 * answers.len() as f64 / 3.0,
            correct_count: answers.len() as u32,
            total_questions: 3,
            passed: Some(answers.len() >= 2),
        })
    }
}

pub fn paper(time_limit_seconds: u32) -> QuizPaper {
    let options = |labels: &[&str]| labels.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    QuizPaper {
        quiz_id: QUIZ_ID.to_string(),
        title: "Rust basics".to_string(),
        time_limit_seconds,
        questions: vec![
            Question {
                id: "q1".to_string(),
                question_type: QuestionType::SingleChoice,
                text: "Which keyword declares an immutable binding?".to_string(),
                options: options(&["let", "mut", "static", "const fn"]),
            },
            Question {
                id: "q2".to_string(),
                question_type: QuestionType::MultipleChoice,
                text: "Which types are Copy?".to_string(),
                options: options(&["A", "B", "C", "D"]),
            },
            Question {
                id: "q3".to_string(),
                question_type: QuestionType::TrueFalse,
                text: "Rust has a garbage collector.".to_string(),
                options: options(&["True", "False"]),
            },
        ],
    }
}

pub fn attempt(
    attempt_id: Option<&str>,
    started_at: Option<DateTime<Utc>>,
    time_limit_seconds: u32,
) -> Attempt {
    Attempt {
        id: attempt_id.map(str::to_string),
        quiz_id: QUIZ_ID.to_string(),
        started_at,
        time_limit_seconds,
    }
}

pub fn mount(api: &Arc<FakeGradingApi>, attempt: Attempt) -> AttemptHandle {
    let paper = Arc::new(paper(attempt.time_limit_seconds));
    let grading: Arc<dyn GradingApi> = api.clone();
    AttemptHandle::mount(attempt, paper, grading, SessionSettings::default())
}

/// Waits (on tokio's clock) until the published view satisfies `predicate`.
pub async fn wait_for_view<F>(handle: &AttemptHandle, predicate: F) -> AttemptView
where
    F: FnMut(&AttemptView) -> bool,
{
    let mut views = handle.watch();
    let view = tokio::time::timeout(Duration::from_secs(120), views.wait_for(predicate))
        .await
        .expect("view condition not reached in time")
        .expect("attempt session dropped its view channel");
    view.clone()
}

pub fn test_config() -> Config {
    Config {
        listen_addr: "127.0.0.1:0".to_string(),
        grading_api: GradingApiSettings {
            base_url: "http://grading.test/api/v1".to_string(),
            api_token: None,
            timeout_ms: 1000,
        },
        engine: EngineSettings::default(),
    }
}

pub fn create_test_state(api: &Arc<FakeGradingApi>) -> Arc<AppState> {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let grading: Arc<dyn GradingApi> = api.clone();
    Arc::new(AppState::with_grading_api(test_config(), grading))
}

pub fn create_test_app(api: &Arc<FakeGradingApi>) -> Router {
    create_router(create_test_state(api))
}
