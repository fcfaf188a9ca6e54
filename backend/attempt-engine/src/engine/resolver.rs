use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::metrics::{ATTEMPTS_RESOLVED_TOTAL, ATTEMPTS_STARTED_TOTAL};
use crate::models::{Attempt, QuizPaper};
use crate::services::grading_client::GradingApi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// An unexpired attempt reported by the server; its start instant is authoritative.
    Resume(Attempt),
    /// Show start/retake; no attempt is created until the user asks for one.
    Overview,
}

/// Decides at screen entry whether to resume an attempt or show the overview.
pub struct AttemptResolver {
    api: Arc<dyn GradingApi>,
}

impl AttemptResolver {
    pub fn new(api: Arc<dyn GradingApi>) -> Self {
        Self { api }
    }

    pub async fn resolve(&self, paper: &QuizPaper) -> EngineResult<Entry> {
        let status = self
            .api
            .get_attempt_status(&paper.quiz_id)
            .await
            .map_err(|e| EngineError::StatusCheckFailed(e.to_string()))?;

        let entry = match status.attempt_id {
            Some(attempt_id) if status.can_continue => {
                if status.started_at.is_none() {
                    tracing::warn!(
                        "Continuation for attempt {} has no start instant, using full time limit",
                        attempt_id
                    );
                }
                tracing::info!(
                    "Resuming attempt {} for quiz {}",
                    attempt_id,
                    paper.quiz_id
                );
                Entry::Resume(Attempt {
                    id: Some(attempt_id),
                    quiz_id: paper.quiz_id.clone(),
                    started_at: status.started_at,
                    time_limit_seconds: paper.time_limit_seconds,
                })
            }
            _ => {
                tracing::info!("No attempt to continue for quiz {}", paper.quiz_id);
                Entry::Overview
            }
        };

        let path = match entry {
            Entry::Resume(_) => "resume",
            Entry::Overview => "overview",
        };
        ATTEMPTS_RESOLVED_TOTAL.with_label_values(&[path]).inc();

        Ok(entry)
    }

    pub async fn start(&self, paper: &QuizPaper) -> EngineResult<Attempt> {
        let started = self
            .api
            .start_attempt(&paper.quiz_id)
            .await
            .map_err(|e| EngineError::AttemptStartFailed(e.to_string()))?;

        ATTEMPTS_STARTED_TOTAL.inc();
        tracing::info!(
            "Started attempt {} for quiz {}",
            started.attempt_id,
            paper.quiz_id
        );

        Ok(Attempt {
            id: Some(started.attempt_id),
            quiz_id: paper.quiz_id.clone(),
            started_at: Some(started.started_at),
            time_limit_seconds: paper.time_limit_seconds,
        })
    }
}
