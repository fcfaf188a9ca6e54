use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::{
    answers::AnswerStore,
    coordinator::{Completion, SubmissionCoordinator, Transition, Trigger},
    countdown::{format_remaining, Countdown, Tick, Ticker},
    flags::FlagStore,
};
use crate::config::EngineSettings;
use crate::error::{EngineError, EngineResult};
use crate::metrics::{SUBMISSIONS_IGNORED_TOTAL, SUBMISSIONS_TOTAL, TIMER_EXPIRIES_TOTAL};
use crate::models::timer::{ExpirySource, TimeExpired, TimerEvent, TimerTick};
use crate::models::{Attempt, AttemptView, Banner, GradedSummary, QuizPaper};
use crate::services::grading_client::GradingApi;

const TIMER_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub tick_interval: Duration,
    pub low_time_warning_seconds: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for SessionSettings {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            tick_interval: Duration::from_millis(settings.tick_interval_ms),
            low_time_warning_seconds: settings.low_time_warning_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualSubmitOutcome {
    Started,
    /// Nothing has been answered; ask the user before submitting.
    ConfirmationRequired,
    Ignored,
    Rejected(EngineError),
}

enum Command {
    SelectOption {
        question_id: String,
        option_index: usize,
        reply: oneshot::Sender<EngineResult<()>>,
    },
    ToggleFlag {
        question_id: String,
        reply: oneshot::Sender<EngineResult<()>>,
    },
    ManualSubmit {
        confirmed: bool,
        reply: oneshot::Sender<ManualSubmitOutcome>,
    },
    DeclineSubmit {
        reply: oneshot::Sender<()>,
    },
    Tick,
    SubmissionResolved {
        trigger: Trigger,
        result: Result<GradedSummary, String>,
    },
    Unmount,
}

/// Owner-side handle of a mounted attempt session. Dropping it unmounts the session.
pub struct AttemptHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<AttemptView>,
    timer: broadcast::Sender<TimerEvent>,
}

impl AttemptHandle {
    /// Mounts a session for an attempt and starts its event loop.
    ///
    /// Remaining time is computed here, once, from the attempt's start instant. An
    /// attempt mounted after its deadline is submitted automatically.
    pub fn mount(
        attempt: Attempt,
        paper: Arc<QuizPaper>,
        api: Arc<dyn GradingApi>,
        settings: SessionSettings,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (timer, _) = broadcast::channel(TIMER_EVENT_CAPACITY);

        let countdown = Countdown::new(attempt.time_limit_seconds, attempt.started_at, Utc::now());
        let coordinator = SubmissionCoordinator::new(attempt.id.clone());

        let mut session = AttemptSession {
            attempt,
            paper,
            api,
            settings,
            answers: AnswerStore::new(),
            flags: FlagStore::new(),
            coordinator,
            countdown,
            ticker: None,
            commands: commands.clone(),
            view: None,
            timer: timer.clone(),
            confirmation_pending: false,
            summary: None,
            mounted: true,
        };

        let (view_tx, view) = watch::channel(session.build_view());
        session.view = Some(view_tx);
        session.on_mount();

        tokio::spawn(session.run(receiver));

        Self {
            commands,
            view,
            timer,
        }
    }

    fn send(&self, command: Command) -> EngineResult<()> {
        self.commands
            .send(command)
            .map_err(|_| EngineError::SessionClosed)
    }

    pub async fn select_option(&self, question_id: &str, option_index: usize) -> EngineResult<()> {
        let (reply, response) = oneshot::channel();
        self.send(Command::SelectOption {
            question_id: question_id.to_string(),
            option_index,
            reply,
        })?;
        response.await.map_err(|_| EngineError::SessionClosed)?
    }

    pub async fn toggle_flag(&self, question_id: &str) -> EngineResult<()> {
        let (reply, response) = oneshot::channel();
        self.send(Command::ToggleFlag {
            question_id: question_id.to_string(),
            reply,
        })?;
        response.await.map_err(|_| EngineError::SessionClosed)?
    }

    /// User-invoked submission. `confirmed` acknowledges submitting with no answers.
    pub async fn manual_submit(&self, confirmed: bool) -> EngineResult<ManualSubmitOutcome> {
        let (reply, response) = oneshot::channel();
        self.send(Command::ManualSubmit { confirmed, reply })?;
        response.await.map_err(|_| EngineError::SessionClosed)
    }

    /// Dismisses the empty-submission prompt. Resolves once the view reflects it.
    pub async fn decline_submit(&self) -> EngineResult<()> {
        let (reply, response) = oneshot::channel();
        self.send(Command::DeclineSubmit { reply })?;
        response.await.map_err(|_| EngineError::SessionClosed)
    }

    pub fn view(&self) -> AttemptView {
        self.view.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<AttemptView> {
        self.view.clone()
    }

    pub fn subscribe_timer(&self) -> broadcast::Receiver<TimerEvent> {
        self.timer.subscribe()
    }

    /// Whether any timer stream is still attached to this session.
    pub fn has_timer_subscribers(&self) -> bool {
        self.timer.receiver_count() > 0
    }

    pub fn unmount(self) {
        // Drop sends the unmount command.
    }
}

impl Drop for AttemptHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Unmount);
    }
}

/// One mounted attempt. All state lives in the session task and is mutated only
/// while processing a single command.
struct AttemptSession {
    attempt: Attempt,
    paper: Arc<QuizPaper>,
    api: Arc<dyn GradingApi>,
    settings: SessionSettings,
    answers: AnswerStore,
    flags: FlagStore,
    coordinator: SubmissionCoordinator,
    countdown: Countdown,
    ticker: Option<Ticker>,
    commands: mpsc::UnboundedSender<Command>,
    view: Option<watch::Sender<AttemptView>>,
    timer: broadcast::Sender<TimerEvent>,
    confirmation_pending: bool,
    summary: Option<GradedSummary>,
    mounted: bool,
}

impl AttemptSession {
    fn on_mount(&mut self) {
        tracing::info!(
            "Mounted attempt {:?} for quiz {}: remaining={}s of {}s",
            self.attempt.id,
            self.attempt.quiz_id,
            self.countdown.remaining(),
            self.countdown.total()
        );

        if self.countdown.expired_on_mount() {
            self.on_expired(ExpirySource::Mount);
        } else if self.countdown.is_timed() {
            self.ticker = Some(Ticker::spawn(
                self.settings.tick_interval,
                self.commands.clone(),
                || Command::Tick,
            ));
        }

        self.publish();
    }

    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = receiver.recv().await {
            if !self.handle(command) {
                break;
            }
        }

        self.ticker = None;
        tracing::debug!("Attempt session {:?} stopped", self.attempt.id);
    }

    /// Returns `false` once the session is unmounted.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::SelectOption {
                question_id,
                option_index,
                reply,
            } => {
                let _ = reply.send(self.select_option(&question_id, option_index));
            }
            Command::ToggleFlag { question_id, reply } => {
                let _ = reply.send(self.toggle_flag(&question_id));
            }
            Command::ManualSubmit { confirmed, reply } => {
                let _ = reply.send(self.manual_submit(confirmed));
            }
            Command::DeclineSubmit { reply } => {
                self.confirmation_pending = false;
                self.publish();
                let _ = reply.send(());
            }
            Command::Tick => self.on_tick(),
            Command::SubmissionResolved { trigger, result } => {
                self.on_submission_resolved(trigger, result)
            }
            Command::Unmount => {
                self.mounted = false;
                self.ticker = None;
                self.publish();
                tracing::info!("Unmounted attempt {:?}", self.attempt.id);
                return false;
            }
        }
        true
    }

    fn select_option(&mut self, question_id: &str, option_index: usize) -> EngineResult<()> {
        let question = self
            .paper
            .question(question_id)
            .ok_or_else(|| EngineError::UnknownQuestion(question_id.to_string()))?;
        if option_index >= question.options.len() {
            return Err(EngineError::InvalidOption {
                question_id: question_id.to_string(),
                option_index,
            });
        }

        let question_type = question.question_type;
        if self
            .answers
            .select_option(question_id, option_index, question_type)
        {
            self.publish();
        }
        Ok(())
    }

    fn toggle_flag(&mut self, question_id: &str) -> EngineResult<()> {
        if self.paper.question(question_id).is_none() {
            return Err(EngineError::UnknownQuestion(question_id.to_string()));
        }
        if self.flags.toggle_flag(question_id) {
            self.publish();
        }
        Ok(())
    }

    fn manual_submit(&mut self, confirmed: bool) -> ManualSubmitOutcome {
        if self.coordinator.is_latched() || self.coordinator.has_submitted() {
            SUBMISSIONS_IGNORED_TOTAL
                .with_label_values(&[Trigger::Manual.as_str()])
                .inc();
            tracing::debug!("Manual submit ignored for attempt {:?}", self.attempt.id);
            return ManualSubmitOutcome::Ignored;
        }

        if !confirmed && !self.answers.has_any_answers() {
            self.confirmation_pending = true;
            self.publish();
            return ManualSubmitOutcome::ConfirmationRequired;
        }

        self.confirmation_pending = false;
        match self.submit(Trigger::Manual) {
            Transition::Dispatch { .. } => ManualSubmitOutcome::Started,
            Transition::Ignored => ManualSubmitOutcome::Ignored,
            Transition::Rejected => ManualSubmitOutcome::Rejected(EngineError::NoAttemptIdentity),
        }
    }

    fn submit(&mut self, trigger: Trigger) -> Transition {
        let transition = self.coordinator.begin(trigger);

        match &transition {
            Transition::Ignored => {
                SUBMISSIONS_IGNORED_TOTAL
                    .with_label_values(&[trigger.as_str()])
                    .inc();
                tracing::debug!(
                    "{} submission ignored for attempt {:?}",
                    trigger,
                    self.attempt.id
                );
            }
            Transition::Rejected => {
                SUBMISSIONS_TOTAL
                    .with_label_values(&[trigger.as_str(), "no_attempt"])
                    .inc();
                tracing::error!(
                    "{} submission for quiz {} has no attempt id",
                    trigger,
                    self.attempt.quiz_id
                );
            }
            Transition::Dispatch {
                attempt_id,
                trigger,
            } => {
                self.ticker = None;
                self.dispatch(attempt_id.clone(), *trigger);
            }
        }

        self.publish();
        transition
    }

    fn dispatch(&self, attempt_id: String, trigger: Trigger) {
        let answers = self.answers.snapshot();
        let api = self.api.clone();
        let commands = self.commands.clone();

        tracing::info!(
            "Submitting attempt {} ({}): {} answered questions",
            attempt_id,
            trigger,
            answers.len()
        );

        tokio::spawn(async move {
            let result = api
                .submit_attempt(&attempt_id, &answers)
                .await
                .map_err(|e| e.to_string());

            match &result {
                Ok(summary) => tracing::info!(
                    "Attempt {} graded: {}/{} correct",
                    attempt_id,
                    summary.correct_count,
                    summary.total_questions
                ),
                Err(e) => tracing::warn!("Attempt {} submission failed: {}", attempt_id, e),
            }

            if commands
                .send(Command::SubmissionResolved { trigger, result })
                .is_err()
            {
                tracing::info!(
                    "Attempt {} session closed before submission resolved, result discarded",
                    attempt_id
                );
            }
        });
    }

    fn on_tick(&mut self) {
        if !self.mounted || self.coordinator.is_submitting() || self.coordinator.has_submitted() {
            return;
        }

        match self.countdown.tick() {
            Tick::Idle => {}
            Tick::Ticked(remaining) => {
                let _ = self.timer.send(TimerEvent::TimerTick(TimerTick {
                    attempt_id: self.attempt.id.clone(),
                    remaining_seconds: remaining,
                    total_seconds: self.countdown.total(),
                    display: format_remaining(remaining),
                    low_time: self.is_low_time(),
                    timestamp: Utc::now(),
                }));
                self.publish();
            }
            Tick::Expired => {
                self.on_expired(ExpirySource::Countdown);
                self.publish();
            }
        }
    }

    fn on_expired(&mut self, source: ExpirySource) {
        self.ticker = None;
        TIMER_EXPIRIES_TOTAL
            .with_label_values(&[source.as_str()])
            .inc();
        tracing::info!(
            "Time expired for attempt {:?} ({})",
            self.attempt.id,
            source.as_str()
        );

        let _ = self.timer.send(TimerEvent::TimeExpired(TimeExpired {
            attempt_id: self.attempt.id.clone(),
            source,
            timestamp: Utc::now(),
            message: "Time limit exceeded".to_string(),
        }));

        self.submit(Trigger::Auto);
    }

    fn on_submission_resolved(&mut self, trigger: Trigger, result: Result<GradedSummary, String>) {
        if !self.mounted {
            tracing::debug!("Discarding submission result for unmounted attempt");
            return;
        }

        match self.coordinator.complete(trigger, result) {
            Completion::Submitted(summary) => {
                SUBMISSIONS_TOTAL
                    .with_label_values(&[trigger.as_str(), "success"])
                    .inc();
                self.answers.disable();
                self.flags.disable();
                self.confirmation_pending = false;
                self.summary = Some(summary);
                tracing::info!("Attempt {:?} submitted", self.attempt.id);
            }
            Completion::Failed(error) => {
                SUBMISSIONS_TOTAL
                    .with_label_values(&[trigger.as_str(), "failure"])
                    .inc();
                let rejected = EngineError::SubmissionRejected {
                    trigger,
                    reason: error.reason().to_string(),
                };
                tracing::warn!(
                    "Attempt {:?}: {} (retry available: {})",
                    self.attempt.id,
                    rejected,
                    error.retry_available()
                );
            }
        }

        self.publish();
    }

    fn is_low_time(&self) -> bool {
        self.countdown.is_timed()
            && self.countdown.remaining() <= self.settings.low_time_warning_seconds
    }

    fn build_view(&self) -> AttemptView {
        let state = self.coordinator.state().clone();
        let remaining = self.countdown.remaining();

        AttemptView {
            attempt: self.attempt.clone(),
            total_questions: self.paper.questions.len(),
            answers: self.answers.as_map(),
            flagged: self.flags.flagged(),
            answered_count: self.answers.answered_count(),
            flagged_count: self.flags.len(),
            timed: self.countdown.is_timed(),
            remaining_seconds: remaining,
            display: format_remaining(remaining),
            low_time: self.is_low_time(),
            expired: self.countdown.has_expired(),
            banner: state.submission_error.as_ref().map(Banner::from),
            submission: state,
            confirmation_pending: self.confirmation_pending,
            summary: self.summary.clone(),
            mounted: self.mounted,
        }
    }

    fn publish(&self) {
        if let Some(view) = &self.view {
            view.send_replace(self.build_view());
        }
    }
}
