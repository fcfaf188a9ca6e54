use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SelectOptionRequest {
    #[validate(length(min = 1, max = 128))]
    pub question_id: String,
    pub option_index: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    /// Acknowledges the "you haven't answered anything" prompt.
    #[serde(default)]
    pub confirm_empty: bool,
}
