use std::sync::{Arc, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use uuid::Uuid;

use crate::engine::{AttemptHandle, AttemptResolver, Entry, ManualSubmitOutcome, SessionSettings};
use crate::error::EngineError;
use crate::metrics::{SCREENS_ACTIVE, SCREENS_EVICTED_TOTAL};
use crate::models::timer::TimerEvent;
use crate::models::{QuizPaper, ScreenMode, ScreenView};
use crate::services::AppState;

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("Screen not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// A mounted quiz screen: the question set plus at most one live attempt session.
pub struct Screen {
    pub id: Uuid,
    paper: Arc<QuizPaper>,
    attempt: Mutex<Option<AttemptHandle>>,
    last_seen: std::sync::Mutex<Instant>,
}

impl Screen {
    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    /// Idle means untouched for `timeout`, not in the middle of a request, and
    /// without an attached timer stream.
    fn is_idle(&self, timeout: Duration) -> bool {
        if self.idle_for() < timeout {
            return false;
        }
        match self.attempt.try_lock() {
            Ok(slot) => !slot
                .as_ref()
                .is_some_and(AttemptHandle::has_timer_subscribers),
            Err(_) => false,
        }
    }

    pub async fn view(&self) -> ScreenView {
        let attempt = self.attempt.lock().await.as_ref().map(AttemptHandle::view);
        ScreenView {
            screen_id: self.id,
            quiz_id: self.paper.quiz_id.clone(),
            title: self.paper.title.clone(),
            time_limit_seconds: self.paper.time_limit_seconds,
            mode: ScreenMode::for_attempt(attempt.as_ref()),
            questions: self.paper.questions.clone(),
            attempt,
        }
    }
}

pub struct ScreenService {
    state: Arc<AppState>,
}

impl ScreenService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn session_settings(&self) -> SessionSettings {
        SessionSettings::from(&self.state.config.engine)
    }

    fn resolver(&self) -> AttemptResolver {
        AttemptResolver::new(self.state.grading.clone())
    }

    /// Loads the question set and decides between overview and resume.
    pub async fn mount(&self, quiz_id: &str) -> Result<ScreenView, ScreenError> {
        let paper = self
            .state
            .grading
            .fetch_questions(quiz_id)
            .await
            .map_err(|e| EngineError::QuestionsFetchFailed(e.to_string()))?;

        if paper.questions.is_empty() {
            return Err(EngineError::NoQuestionsAvailable(quiz_id.to_string()).into());
        }

        let paper = Arc::new(paper);
        let attempt = match self.resolver().resolve(&paper).await? {
            Entry::Resume(attempt) => Some(AttemptHandle::mount(
                attempt,
                paper.clone(),
                self.state.grading.clone(),
                self.session_settings(),
            )),
            Entry::Overview => None,
        };

        let screen = Arc::new(Screen {
            id: Uuid::new_v4(),
            paper,
            attempt: Mutex::new(attempt),
            last_seen: std::sync::Mutex::new(Instant::now()),
        });

        self.state
            .screens
            .write()
            .await
            .insert(screen.id, screen.clone());
        SCREENS_ACTIVE.inc();

        tracing::info!("Mounted screen {} for quiz {}", screen.id, quiz_id);
        Ok(screen.view().await)
    }

    pub async fn get(&self, screen_id: Uuid) -> Result<Arc<Screen>, ScreenError> {
        let screen = self
            .state
            .screens
            .read()
            .await
            .get(&screen_id)
            .cloned()
            .ok_or(ScreenError::NotFound)?;
        screen.touch();
        Ok(screen)
    }

    pub async fn view(&self, screen_id: Uuid) -> Result<ScreenView, ScreenError> {
        Ok(self.get(screen_id).await?.view().await)
    }

    /// Starts a new attempt from the overview, or a retake from the results.
    pub async fn start_attempt(&self, screen_id: Uuid) -> Result<ScreenView, ScreenError> {
        let screen = self.get(screen_id).await?;

        {
            let mut slot = screen.attempt.lock().await;
            if let Some(handle) = slot.as_ref() {
                if !handle.view().submission.has_submitted {
                    return Err(ScreenError::Conflict(
                        "An attempt is already in progress".to_string(),
                    ));
                }
            }

            let attempt = self.resolver().start(&screen.paper).await?;
            // Replacing the slot drops the previous handle, which unmounts its session.
            *slot = Some(AttemptHandle::mount(
                attempt,
                screen.paper.clone(),
                self.state.grading.clone(),
                self.session_settings(),
            ));
        }

        Ok(screen.view().await)
    }

    pub async fn select_option(
        &self,
        screen_id: Uuid,
        question_id: &str,
        option_index: usize,
    ) -> Result<ScreenView, ScreenError> {
        let screen = self.get(screen_id).await?;
        {
            let slot = screen.attempt.lock().await;
            let handle = slot.as_ref().ok_or_else(no_attempt)?;
            handle.select_option(question_id, option_index).await?;
        }
        Ok(screen.view().await)
    }

    pub async fn toggle_flag(
        &self,
        screen_id: Uuid,
        question_id: &str,
    ) -> Result<ScreenView, ScreenError> {
        let screen = self.get(screen_id).await?;
        {
            let slot = screen.attempt.lock().await;
            let handle = slot.as_ref().ok_or_else(no_attempt)?;
            handle.toggle_flag(question_id).await?;
        }
        Ok(screen.view().await)
    }

    pub async fn submit(
        &self,
        screen_id: Uuid,
        confirm_empty: bool,
    ) -> Result<(ManualSubmitOutcome, ScreenView), ScreenError> {
        let screen = self.get(screen_id).await?;
        let outcome = {
            let slot = screen.attempt.lock().await;
            let handle = slot.as_ref().ok_or_else(no_attempt)?;
            handle.manual_submit(confirm_empty).await?
        };
        Ok((outcome, screen.view().await))
    }

    pub async fn decline_submit(&self, screen_id: Uuid) -> Result<ScreenView, ScreenError> {
        let screen = self.get(screen_id).await?;
        {
            let slot = screen.attempt.lock().await;
            let handle = slot.as_ref().ok_or_else(no_attempt)?;
            handle.decline_submit().await?;
        }
        Ok(screen.view().await)
    }

    pub async fn subscribe_timer(
        &self,
        screen_id: Uuid,
    ) -> Result<broadcast::Receiver<TimerEvent>, ScreenError> {
        let screen = self.get(screen_id).await?;
        let slot = screen.attempt.lock().await;
        let handle = slot.as_ref().ok_or_else(no_attempt)?;
        Ok(handle.subscribe_timer())
    }

    /// Removes the screen; its attempt session is torn down with it.
    pub async fn unmount(&self, screen_id: Uuid) -> Result<(), ScreenError> {
        let screen = self
            .state
            .screens
            .write()
            .await
            .remove(&screen_id)
            .ok_or(ScreenError::NotFound)?;

        if let Some(handle) = screen.attempt.lock().await.take() {
            handle.unmount();
        }
        SCREENS_ACTIVE.dec();

        tracing::info!("Unmounted screen {}", screen_id);
        Ok(())
    }

    /// Unmounts every idle screen and returns how many were removed.
    pub async fn evict_idle(&self, idle_timeout: Duration) -> usize {
        let evicted: Vec<Arc<Screen>> = {
            let mut screens = self.state.screens.write().await;
            let idle: Vec<Uuid> = screens
                .values()
                .filter(|screen| screen.is_idle(idle_timeout))
                .map(|screen| screen.id)
                .collect();
            idle.iter().filter_map(|id| screens.remove(id)).collect()
        };

        for screen in &evicted {
            if let Ok(mut slot) = screen.attempt.try_lock() {
                if let Some(handle) = slot.take() {
                    handle.unmount();
                }
            }
            tracing::info!(
                "Evicted idle screen {} (idle {}s)",
                screen.id,
                screen.idle_for().as_secs()
            );
        }

        SCREENS_ACTIVE.sub(evicted.len() as i64);
        SCREENS_EVICTED_TOTAL.inc_by(evicted.len() as u64);
        evicted.len()
    }
}

fn no_attempt() -> ScreenError {
    ScreenError::Conflict("No attempt has been started on this screen".to_string())
}
