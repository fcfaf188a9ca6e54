use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{GradedSummary, SubmissionError, SubmissionState};

/// What caused a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Manual,
    Auto,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Manual => "manual",
            Trigger::Auto => "auto",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Another submission holds the latch, or the attempt is already submitted.
    Ignored,
    /// No attempt id is known; recorded as a fatal error.
    Rejected,
    /// The caller must send the answer snapshot exactly once.
    Dispatch { attempt_id: String, trigger: Trigger },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Submitted(GradedSummary),
    Failed(SubmissionError),
}

/// Exactly-once submission state machine: `idle -> submitting -> submitted`,
/// with `submitting -> idle` only after a failed manual submission.
#[derive(Debug, Clone, Default)]
pub struct SubmissionCoordinator {
    attempt_id: Option<String>,
    latch: bool,
    state: SubmissionState,
}

impl SubmissionCoordinator {
    pub fn new(attempt_id: Option<String>) -> Self {
        Self {
            attempt_id,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn is_latched(&self) -> bool {
        self.latch
    }

    pub fn has_submitted(&self) -> bool {
        self.state.has_submitted
    }

    pub fn is_submitting(&self) -> bool {
        self.state.is_submitting
    }

    /// Single entry point for both triggers. The latch is checked and set before
    /// anything asynchronous is scheduled.
    pub fn begin(&mut self, trigger: Trigger) -> Transition {
        if self.latch || self.state.has_submitted {
            return Transition::Ignored;
        }

        let Some(attempt_id) = self.attempt_id.clone() else {
            self.state.submission_error = Some(SubmissionError::NoAttemptIdentity);
            return Transition::Rejected;
        };

        self.latch = true;
        self.state.is_submitting = true;
        self.state.submission_error = None;
        self.state.auto_submit_attempted = trigger == Trigger::Auto;

        Transition::Dispatch {
            attempt_id,
            trigger,
        }
    }

    pub fn complete(
        &mut self,
        trigger: Trigger,
        result: Result<GradedSummary, String>,
    ) -> Completion {
        self.state.is_submitting = false;

        match result {
            Ok(summary) => {
                self.state.has_submitted = true;
                Completion::Submitted(summary)
            }
            Err(reason) => {
                let error = match trigger {
                    // Deadline has passed: the latch stays held until the screen is re-entered.
                    Trigger::Auto => SubmissionError::AutoSubmitFailed { reason },
                    Trigger::Manual => {
                        self.latch = false;
                        SubmissionError::SubmitFailed { reason }
                    }
                };
                self.state.submission_error = Some(error.clone());
                Completion::Failed(error)
            }
        }
    }
}
