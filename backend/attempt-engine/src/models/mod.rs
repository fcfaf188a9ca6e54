use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod request;
pub mod timer;
pub mod view;

pub use view::{AttemptView, Banner, ScreenMode, ScreenView, SubmissionError, SubmissionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
}

impl QuestionType {
    /// Whether a selection replaces the previous one instead of toggling.
    pub fn is_exclusive(self) -> bool {
        !matches!(self, QuestionType::MultipleChoice)
    }
}

/// Question as served to the test-taker. Carries no correctness data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub text: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizPaper {
    pub quiz_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub time_limit_seconds: u32,
    pub questions: Vec<Question>,
}

impl QuizPaper {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

/// One timed instance of a user taking a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Option<String>,
    pub quiz_id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub time_limit_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedAttempt {
    pub attempt_id: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttemptStatus {
    pub can_continue: bool,
    #[serde(default)]
    pub attempt_id: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

/// One element of the submitted answer list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question_id: String,
    pub selected_option_indexes: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct SubmitAttemptRequest<'a> {
    pub answers: &'a [AnswerEntry],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedSummary {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub correct_count: u32,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub passed: Option<bool>,
}
