use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::{
    sync::mpsc::UnboundedSender,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

/// Remaining time derived from the server-issued start instant.
///
/// A start instant in the future (clock skew) counts as zero elapsed time, so the
/// result never exceeds `time_limit_seconds`. Without a start instant the full
/// limit is returned.
pub fn remaining_seconds(
    time_limit_seconds: u32,
    started_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> u32 {
    let Some(started_at) = started_at else {
        return time_limit_seconds;
    };

    let elapsed = (now - started_at).num_seconds().max(0);
    (i64::from(time_limit_seconds) - elapsed).max(0) as u32
}

/// `MM:SS`, or `H:MM:SS` for limits of an hour or more.
pub fn format_remaining(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Untimed attempt or expiry already reported.
    Idle,
    Ticked(u32),
    Expired,
}

/// In-memory countdown display value for one attempt.
#[derive(Debug, Clone)]
pub struct Countdown {
    total: u32,
    remaining: u32,
    expired: bool,
}

impl Countdown {
    pub fn new(time_limit_seconds: u32, started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Self {
            total: time_limit_seconds,
            remaining: remaining_seconds(time_limit_seconds, started_at, now),
            expired: false,
        }
    }

    pub fn is_timed(&self) -> bool {
        self.total > 0
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn has_expired(&self) -> bool {
        self.expired
    }

    /// Reports an attempt whose deadline passed before it was mounted.
    pub fn expired_on_mount(&mut self) -> bool {
        self.observe_expiry()
    }

    pub fn tick(&mut self) -> Tick {
        if !self.is_timed() || self.expired {
            return Tick::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.observe_expiry() {
            Tick::Expired
        } else {
            Tick::Ticked(self.remaining)
        }
    }

    fn observe_expiry(&mut self) -> bool {
        if self.is_timed() && self.remaining == 0 && !self.expired {
            self.expired = true;
            return true;
        }
        false
    }
}

/// Periodic tick source. The spawned task is aborted when the ticker is dropped.
#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn<T, F>(period: Duration, tx: UnboundedSender<T>, event: F) -> Self
    where
        T: Send + 'static,
        F: Fn() -> T + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(event()).is_err() {
                    break;
                }
            }
        });

        Self { handle }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
