//! In-process publish/subscribe bus.
//!
//! Topics are typed: a filter's topic is derived from its kind and its
//! process-unique sequence id, so two stages can never collide on the same
//! topic by accident. Publishing runs every subscriber inline, in
//! subscription order, on the caller's task.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::message::Message;

/// Process-wide sequence shared by every filter and feeder topic.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Allocate the next process-unique sequence number.
pub fn next_sequence() -> u64 {
    NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

/// A bus topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(String);

impl Topic {
    /// Topic owned by a stage instance: `<kind>:<id>`.
    pub fn sequenced(kind: &str, id: u64) -> Self {
        Self(format!("{kind}:{id}"))
    }

    /// A free-form topic chosen by whoever wires a feeder.
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Something that consumes messages published on a topic.
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn receive(&self, msg: Message);
}

/// Routes published messages to every subscriber of the same topic.
pub struct Bus {
    subscribers: RwLock<HashMap<Topic, Vec<Arc<dyn Subscriber>>>>,
}

impl Bus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: RwLock::new(HashMap::new()),
        })
    }

    pub async fn subscribe(&self, topic: Topic, subscriber: Arc<dyn Subscriber>) {
        debug!(topic = %topic, "Subscribing");
        self.subscribers
            .write()
            .await
            .entry(topic)
            .or_default()
            .push(subscriber);
    }

    /// Number of subscribers currently registered on `topic`.
    pub async fn subscriber_count(&self, topic: &Topic) -> usize {
        self.subscribers
            .read()
            .await
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Deliver `msg` to every subscriber of `topic`. Each subscriber gets its own copy.
    pub async fn publish(&self, topic: &Topic, msg: Message) {
        let targets = match self.subscribers.read().await.get(topic) {
            Some(subs) => subs.clone(),
            None => {
                debug!(topic = %topic, "No subscriber, message dropped");
                return;
            }
        };

        let Some((last, rest)) = targets.split_last() else {
            return;
        };
        for sub in rest {
            sub.receive(msg.clone()).await;
        }
        last.receive(msg).await;
    }
}
