use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::GradingApiSettings;
use crate::models::{
    AnswerEntry, AttemptStatus, GradedSummary, QuizPaper, StartedAttempt, SubmitAttemptRequest,
};
use crate::utils::retry::{retry_async_with_config, RetryConfig};

/// Boundary to the grading service that owns questions and attempt records.
#[async_trait]
pub trait GradingApi: Send + Sync {
    async fn fetch_questions(&self, quiz_id: &str) -> Result<QuizPaper>;

    async fn start_attempt(&self, quiz_id: &str) -> Result<StartedAttempt>;

    async fn get_attempt_status(&self, quiz_id: &str) -> Result<AttemptStatus>;

    async fn submit_attempt(
        &self,
        attempt_id: &str,
        answers: &[AnswerEntry],
    ) -> Result<GradedSummary>;
}

pub struct HttpGradingClient {
    http_client: Client,
    base_url: Url,
    api_token: Option<String>,
    timeout: Duration,
}

impl HttpGradingClient {
    pub fn new(settings: &GradingApiSettings) -> Result<Self> {
        let mut base_url =
            Url::parse(&settings.base_url).context("Invalid grading API base URL")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http_client: Client::new(),
            base_url,
            api_token: settings.api_token.clone(),
            timeout: Duration::from_millis(settings.timeout_ms),
        })
    }

    /// Appends `segments` to the base path. Each segment is percent-encoded on its
    /// own, so identifiers cannot add path levels or a query string.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Grading API base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.timeout(self.timeout);
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!("Calling grading API: GET {}", url);

        let response = self
            .authorize(self.http_client.get(url))
            .send()
            .await
            .context("Failed to call grading API")?;

        decode(response).await
    }
}

/// Rejects identifiers that are empty or would be read as dot segments.
fn path_id(id: &str) -> Result<&str> {
    if id.is_empty() || id == "." || id == ".." {
        bail!("Invalid grading API identifier {:?}", id);
    }
    Ok(id)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(anyhow!(
            "Grading API returned error {}: {}",
            status,
            error_text
        ));
    }

    response
        .json()
        .await
        .context("Failed to parse grading API response")
}

#[async_trait]
impl GradingApi for HttpGradingClient {
    async fn fetch_questions(&self, quiz_id: &str) -> Result<QuizPaper> {
        let url = self.endpoint(&["quizzes", path_id(quiz_id)?, "questions"])?;
        retry_async_with_config(RetryConfig::default(), || {
            self.get_json::<QuizPaper>(url.clone())
        })
        .await
    }

    async fn start_attempt(&self, quiz_id: &str) -> Result<StartedAttempt> {
        let url = self.endpoint(&["quizzes", path_id(quiz_id)?, "attempts"])?;
        tracing::debug!("Calling grading API: POST {}", url);

        let response = self
            .authorize(self.http_client.post(url))
            .send()
            .await
            .context("Failed to start attempt")?;

        decode(response).await
    }

    async fn get_attempt_status(&self, quiz_id: &str) -> Result<AttemptStatus> {
        let url = self.endpoint(&["quizzes", path_id(quiz_id)?, "attempts", "status"])?;
        retry_async_with_config(RetryConfig::default(), || {
            self.get_json::<AttemptStatus>(url.clone())
        })
        .await
    }

    async fn submit_attempt(
        &self,
        attempt_id: &str,
        answers: &[AnswerEntry],
    ) -> Result<GradedSummary> {
        let url = self.endpoint(&["attempts", path_id(attempt_id)?, "submit"])?;
        tracing::debug!(
            "Calling grading API: POST {} with {} answers",
            url,
            answers.len()
        );

        let response = self
            .authorize(self.http_client.post(url))
            .json(&SubmitAttemptRequest { answers })
            .send()
            .await
            .context("Failed to submit attempt")?;

        decode(response).await
    }
}
