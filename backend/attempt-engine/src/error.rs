use thiserror::Error;

use crate::engine::Trigger;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("no valid attempt to submit")]
    NoAttemptIdentity,

    #[error("{trigger} submission rejected: {reason}")]
    SubmissionRejected { trigger: Trigger, reason: String },

    #[error("quiz {0} has no questions")]
    NoQuestionsAvailable(String),

    #[error("failed to fetch questions: {0}")]
    QuestionsFetchFailed(String),

    #[error("failed to check attempt status: {0}")]
    StatusCheckFailed(String),

    #[error("failed to start attempt: {0}")]
    AttemptStartFailed(String),

    #[error("unknown question {0}")]
    UnknownQuestion(String),

    #[error("option {option_index} is out of range for question {question_id}")]
    InvalidOption {
        question_id: String,
        option_index: usize,
    },

    #[error("attempt session is no longer running")]
    SessionClosed,
}
