//! Feeder scheduling: one pass immediately on start, then one per tick
//! until stopped.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::bus::{Bus, Topic};
use crate::error::{ConfigError, FeederError};
use crate::message::Message;

/// A message source polled by a [`Feeder`].
#[async_trait]
pub trait Feed: Send + Sync + 'static {
    /// Interval between passes.
    fn frequency(&self) -> Duration;

    /// Run one pass and return the messages it produced.
    async fn parse_feed(&self) -> Result<Vec<Message>, FeederError>;
}

enum State {
    Created,
    Running {
        stop: oneshot::Sender<()>,
        handle: JoinHandle<()>,
    },
    Stopped,
}

impl State {
    fn label(&self) -> &'static str {
        match self {
            State::Created => "created",
            State::Running { .. } => "running",
            State::Stopped => "stopped",
        }
    }
}

struct Shared {
    rule: String,
    kind: String,
    source: Arc<dyn Feed>,
    bus: Arc<Bus>,
    topic: Topic,
    last_parsing: Mutex<Option<DateTime<Utc>>>,
}

impl Shared {
    /// Run one pass. Failures are logged and never end the loop.
    async fn pass(&self) {
        debug!(rule = %self.rule, feeder = %self.kind, "Starting pass");
        match self.source.parse_feed().await {
            Ok(messages) => {
                for msg in messages {
                    self.bus.publish(&self.topic, msg).await;
                }
                let now = Utc::now();
                if let Ok(mut last) = self.last_parsing.lock() {
                    *last = Some(now);
                }
                debug!(
                    rule = %self.rule,
                    feeder = %self.kind,
                    finished = %now.format("%Y-%m-%d %H:%M:%S"),
                    "Pass finished"
                );
            }
            Err(e) => {
                error!(rule = %self.rule, feeder = %self.kind, "{e}");
            }
        }
    }
}

/// A scheduled producer bound to a rule and a publish topic.
///
/// Lifecycle is `created -> running -> stopped`; a stopped feeder cannot be
/// restarted. Missed ticks are skipped, so a pass slower than the frequency
/// delays the cadence rather than queueing passes.
pub struct Feeder {
    shared: Arc<Shared>,
    frequency: Duration,
    state: Mutex<State>,
}

impl Feeder {
    pub fn new(
        rule: impl Into<String>,
        kind: impl Into<String>,
        source: Arc<dyn Feed>,
        bus: Arc<Bus>,
        topic: Topic,
    ) -> Result<Self, ConfigError> {
        let frequency = source.frequency();
        if frequency.is_zero() {
            return Err(ConfigError::invalid("frequency", "must be greater than zero"));
        }
        Ok(Self {
            shared: Arc::new(Shared {
                rule: rule.into(),
                kind: kind.into(),
                source,
                bus,
                topic,
                last_parsing: Mutex::new(None),
            }),
            frequency,
            state: Mutex::new(State::Created),
        })
    }

    pub fn rule(&self) -> &str {
        &self.shared.rule
    }

    pub fn kind(&self) -> &str {
        &self.shared.kind
    }

    pub fn frequency(&self) -> Duration {
        self.frequency
    }

    /// The topic passes are published on.
    pub fn topic(&self) -> &Topic {
        &self.shared.topic
    }

    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .map(|s| matches!(*s, State::Running { .. }))
            .unwrap_or(false)
    }

    /// When the last successful pass finished.
    pub fn last_parsing(&self) -> Option<DateTime<Utc>> {
        self.shared.last_parsing.lock().ok().and_then(|l| *l)
    }

    /// Spawn the scheduling loop. Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), FeederError> {
        let mut state = self.lock_state()?;
        if !matches!(*state, State::Created) {
            return Err(self.invalid("start", state.label()));
        }

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let shared = Arc::clone(&self.shared);
        let frequency = self.frequency;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + frequency, frequency);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            shared.pass().await;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => {
                        debug!(rule = %shared.rule, feeder = %shared.kind, "Stop arrived");
                        break;
                    }
                    _ = ticker.tick() => shared.pass().await,
                }
            }
        });

        info!(
            rule = %self.shared.rule,
            feeder = %self.shared.kind,
            every = ?self.frequency,
            "Feeder started"
        );
        *state = State::Running {
            stop: stop_tx,
            handle,
        };
        Ok(())
    }

    /// Signal the loop and wait until it has exited. An in-flight pass is
    /// allowed to finish. Must not be called from inside the loop itself.
    pub async fn stop(&self) -> Result<(), FeederError> {
        let previous = {
            let mut state = self.lock_state()?;
            if !matches!(*state, State::Running { .. }) {
                return Err(self.invalid("stop", state.label()));
            }
            std::mem::replace(&mut *state, State::Stopped)
        };

        if let State::Running { stop, handle } = previous {
            // A closed receiver means the loop already ended.
            let _ = stop.send(());
            if let Err(e) = handle.await {
                error!(rule = %self.shared.rule, feeder = %self.shared.kind, "Feeder task failed: {e}");
            }
        }
        info!(rule = %self.shared.rule, feeder = %self.shared.kind, "Feeder stopped");
        Ok(())
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, State>, FeederError> {
        self.state.lock().map_err(|_| FeederError::Failed {
            name: self.shared.kind.clone(),
            reason: "state lock poisoned".into(),
        })
    }

    fn invalid(&self, action: &'static str, state: &'static str) -> FeederError {
        FeederError::InvalidState {
            name: self.shared.kind.clone(),
            action,
            state,
        }
    }
}

impl std::fmt::Debug for Feeder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feeder")
            .field("rule", &self.shared.rule)
            .field("kind", &self.shared.kind)
            .field("topic", &self.shared.topic)
            .field("frequency", &self.frequency)
            .finish()
    }
}
