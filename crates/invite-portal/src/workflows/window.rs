//! Score-entry window: the configured interval during which applicants may
//! additionally submit grades and rank data.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::timestamp::parse_instant;
use crate::clock::Clock;

/// Window boundaries as stored by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    #[serde(default)]
    pub score_entry_start: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub score_entry_end: Option<String>,
}

impl SystemConfig {
    pub fn new(start: impl Into<String>, end: Option<String>) -> Self {
        Self {
            score_entry_start: start.into(),
            score_entry_end: end.filter(|value| !value.trim().is_empty()),
        }
    }

    /// The end boundary as sent on the wire, empty when open-ended.
    pub fn end_or_empty(&self) -> &str {
        self.score_entry_end.as_deref().unwrap_or_default()
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|value| !value.trim().is_empty()))
}

/// Parsed window. A missing or unparseable start keeps the window closed; an
/// unparseable end is ignored and leaves the window open-ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreEntryWindow {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl ScoreEntryWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            start: parse_instant(&config.score_entry_start),
            end: config.score_entry_end.as_deref().and_then(parse_instant),
        }
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn is_open_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        let now = now.with_timezone(&Utc);
        match self.start {
            Some(start) if now >= start => self.end.map_or(true, |end| now <= end),
            _ => false,
        }
    }
}

/// Snapshot of the window for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowStatus {
    pub open: bool,
    pub start: String,
    pub end: String,
    pub evaluated_at: DateTime<Local>,
}

impl WindowStatus {
    pub fn describe(config: &SystemConfig, now: DateTime<Local>) -> Self {
        let window = ScoreEntryWindow::from_config(config);
        Self {
            open: window.is_open_at(&now),
            start: display_boundary(&config.score_entry_start),
            end: display_boundary(config.end_or_empty()),
            evaluated_at: now,
        }
    }
}

/// Renders a configured boundary as `YYYY/MM/DD HH:MM` in local time.
pub fn display_boundary(raw: &str) -> String {
    if raw.trim().is_empty() {
        return "not set".to_string();
    }
    match parse_instant(raw) {
        Some(instant) => instant
            .with_timezone(&Local)
            .format("%Y/%m/%d %H:%M")
            .to_string(),
        None => "invalid".to_string(),
    }
}

struct GateState {
    definition: RwLock<WindowDefinition>,
    clock: Arc<dyn Clock>,
    sender: watch::Sender<bool>,
}

#[derive(Clone)]
struct WindowDefinition {
    config: SystemConfig,
    window: ScoreEntryWindow,
}

impl WindowDefinition {
    fn new(config: SystemConfig) -> Self {
        let window = ScoreEntryWindow::from_config(&config);
        Self { config, window }
    }
}

impl GateState {
    fn evaluate(&self) -> bool {
        let window = self
            .definition
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .window;
        let open = window.is_open_at(&self.clock.now());
        let changed = self.sender.send_if_modified(|current| {
            if *current == open {
                false
            } else {
                *current = open;
                true
            }
        });
        if changed {
            info!(open, "score-entry window changed state");
        }
        open
    }
}

/// Re-evaluates the window on a fixed cadence and publishes transitions.
///
/// The background task is aborted when the gate is dropped.
pub struct WindowGate {
    state: Arc<GateState>,
    task: JoinHandle<()>,
}

impl WindowGate {
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: SystemConfig, clock: Arc<dyn Clock>, cadence: Duration) -> Self {
        let definition = WindowDefinition::new(config);
        let initial = definition.window.is_open_at(&clock.now());
        let (sender, _) = watch::channel(initial);
        let state = Arc::new(GateState {
            definition: RwLock::new(definition),
            clock,
            sender,
        });

        let worker = Arc::clone(&state);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                worker.evaluate();
            }
        });

        debug!(initial, ?cadence, "window gate started");
        Self { state, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.sender.subscribe()
    }

    /// Evaluates against the current time rather than the last tick.
    pub fn is_open(&self) -> bool {
        self.state.evaluate()
    }

    pub fn window(&self) -> ScoreEntryWindow {
        self.definition().window
    }

    pub fn config(&self) -> SystemConfig {
        self.definition().config
    }

    pub fn status(&self) -> WindowStatus {
        WindowStatus::describe(&self.definition().config, self.state.clock.now())
    }

    /// Swaps the configuration after an administrative update and
    /// re-evaluates immediately.
    pub fn replace(&self, config: SystemConfig) -> bool {
        *self
            .state
            .definition
            .write()
            .unwrap_or_else(PoisonError::into_inner) = WindowDefinition::new(config);
        self.state.evaluate()
    }

    fn definition(&self) -> WindowDefinition {
        self.state
            .definition
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for WindowGate {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for WindowGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowGate")
            .field("window", &self.window())
            .finish_non_exhaustive()
    }
}
