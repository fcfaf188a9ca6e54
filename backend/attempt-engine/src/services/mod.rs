use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use grading_client::{GradingApi, HttpGradingClient};
use screen_service::Screen;

pub mod grading_client;
pub mod screen_service;
pub mod screen_sweeper;

pub struct AppState {
    pub config: Config,
    pub grading: Arc<dyn GradingApi>,
    pub screens: RwLock<HashMap<Uuid, Arc<Screen>>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let grading = HttpGradingClient::new(&config.grading_api)?;
        tracing::info!("Grading API client configured: {}", config.grading_api.base_url);
        Ok(Self::with_grading_api(config, Arc::new(grading)))
    }

    pub fn with_grading_api(config: Config, grading: Arc<dyn GradingApi>) -> Self {
        Self {
            config,
            grading,
            screens: RwLock::new(HashMap::new()),
        }
    }
}
