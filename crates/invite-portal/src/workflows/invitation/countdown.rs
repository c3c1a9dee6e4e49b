use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::result::InvitationResult;
use crate::clock::Clock;

/// Tracks time left until an issued code expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryTracker {
    expires_at: DateTime<Utc>,
}

impl ExpiryTracker {
    pub fn new(expires_at: DateTime<Utc>) -> Self {
        Self { expires_at }
    }

    pub fn for_result(result: &InvitationResult) -> Option<Self> {
        result.expires_at_instant().map(Self::new)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Zero once the expiry instant has been reached.
    pub fn remaining<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Duration {
        let now = now.with_timezone(&Utc);
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_expired<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.remaining(now).is_zero()
    }

    pub fn display<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String {
        format_remaining(self.remaining(now))
    }

    /// Ticks every `cadence`, publishing the `MM:SS` display. When the code
    /// expires the display is set to `00:00`, `on_expire` is spawned once and
    /// the task ends.
    pub fn spawn<F>(self, clock: Arc<dyn Clock>, cadence: Duration, on_expire: F) -> CountdownHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = watch::channel(self.display(&clock.now()));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let now: DateTime<Local> = clock.now();
                if self.is_expired(&now) {
                    sender.send_replace(format_remaining(Duration::ZERO));
                    info!(expires_at = %self.expires_at, "invitation code expired");
                    tokio::spawn(on_expire);
                    break;
                }
                sender.send_replace(self.display(&now));
            }
        });
        debug!(expires_at = %self.expires_at, "countdown started");
        CountdownHandle { receiver, task }
    }
}

/// Zero-padded `MM:SS`. Minutes wrap at the hour, so anything past sixty
/// minutes shows only the sub-hour part.
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    format!("{minutes:02}:{seconds:02}")
}

/// Live countdown; the ticking task is aborted when this is dropped.
#[derive(Debug)]
pub struct CountdownHandle {
    receiver: watch::Receiver<String>,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    pub fn display(&self) -> String {
        self.receiver.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.receiver.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
