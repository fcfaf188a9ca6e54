use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Attempt, GradedSummary, Question};

pub const SUBMIT_FAILED_MESSAGE: &str = "Error submitting quiz. Please try again.";
pub const AUTO_SUBMIT_FAILED_MESSAGE: &str =
    "Auto-submit error: time ran out but your answers could not be submitted. Please refresh the page.";
pub const NO_ATTEMPT_MESSAGE: &str = "No valid attempt found. Please refresh the page to start again.";

/// Reason recorded by the submission coordinator when a submission did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionError {
    NoAttemptIdentity,
    SubmitFailed { reason: String },
    AutoSubmitFailed { reason: String },
}

impl SubmissionError {
    pub fn message(&self) -> &'static str {
        match self {
            SubmissionError::NoAttemptIdentity => NO_ATTEMPT_MESSAGE,
            SubmissionError::SubmitFailed { .. } => SUBMIT_FAILED_MESSAGE,
            SubmissionError::AutoSubmitFailed { .. } => AUTO_SUBMIT_FAILED_MESSAGE,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            SubmissionError::SubmitFailed { reason } | SubmissionError::AutoSubmitFailed { reason } => {
                reason
            }
            SubmissionError::NoAttemptIdentity => self.message(),
        }
    }

    /// Only a failed manual submission can be retried from the same screen.
    pub fn retry_available(&self) -> bool {
        matches!(self, SubmissionError::SubmitFailed { .. })
    }

    pub fn refresh_required(&self) -> bool {
        !self.retry_available()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionState {
    pub is_submitting: bool,
    pub has_submitted: bool,
    pub submission_error: Option<SubmissionError>,
    pub auto_submit_attempted: bool,
}

/// User-visible error banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub message: String,
    pub retry_available: bool,
    pub refresh_required: bool,
}

impl From<&SubmissionError> for Banner {
    fn from(error: &SubmissionError) -> Self {
        Self {
            message: error.message().to_string(),
            retry_available: error.retry_available(),
            refresh_required: error.refresh_required(),
        }
    }
}

/// Snapshot of one attempt session, published after every processed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptView {
    pub attempt: Attempt,
    pub total_questions: usize,
    pub answers: BTreeMap<String, Vec<usize>>,
    pub flagged: Vec<String>,
    pub answered_count: usize,
    pub flagged_count: usize,
    pub timed: bool,
    pub remaining_seconds: u32,
    pub display: String,
    pub low_time: bool,
    pub expired: bool,
    pub submission: SubmissionState,
    pub banner: Option<Banner>,
    pub confirmation_pending: bool,
    pub summary: Option<GradedSummary>,
    pub mounted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenMode {
    Overview,
    Taking,
    Results,
}

impl ScreenMode {
    pub fn for_attempt(view: Option<&AttemptView>) -> Self {
        match view {
            None => ScreenMode::Overview,
            Some(v) if v.submission.has_submitted => ScreenMode::Results,
            Some(_) => ScreenMode::Taking,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenView {
    pub screen_id: Uuid,
    pub quiz_id: String,
    pub title: String,
    pub time_limit_seconds: u32,
    pub mode: ScreenMode,
    pub questions: Vec<Question>,
    pub attempt: Option<AttemptView>,
}
