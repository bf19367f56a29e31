//! Shared filter engine: identity, negation, error isolation, propagation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::bus::{Bus, Subscriber, Topic, next_sequence};
use crate::error::FilterError;
use crate::message::{Message, RULE_NAME_KEY};

/// The single operation a filter kind implements.
///
/// Implementations may rewrite the message; the rewrite is only forwarded
/// when the filter matches.
#[async_trait]
pub trait Predicate: Send + Sync {
    async fn test(&self, msg: &mut Message) -> Result<bool, FilterError>;
}

/// Whether a filter's test result is used as-is or inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    Direct,
    Negated,
}

impl Polarity {
    pub fn from_negate(negate: bool) -> Self {
        if negate { Self::Negated } else { Self::Direct }
    }

    pub fn apply(self, result: bool) -> bool {
        match self {
            Self::Direct => result,
            Self::Negated => !result,
        }
    }
}

/// A filter stage bound to a rule and a bus.
pub struct Filter {
    rule: String,
    kind: String,
    id: u64,
    topic: Topic,
    polarity: Polarity,
    predicate: Box<dyn Predicate>,
    bus: Arc<Bus>,
}

impl Filter {
    /// Wrap `predicate` as a stage of `rule`. A fresh process-unique id is assigned.
    pub fn new(
        rule: impl Into<String>,
        kind: impl Into<String>,
        predicate: Box<dyn Predicate>,
        polarity: Polarity,
        bus: Arc<Bus>,
    ) -> Self {
        let kind = kind.into();
        let id = next_sequence();
        Self {
            rule: rule.into(),
            topic: Topic::sequenced(&kind, id),
            kind,
            id,
            polarity,
            predicate,
            bus,
        }
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// The topic this filter publishes matches on. Stable for the filter's lifetime.
    pub fn identifier(&self) -> &Topic {
        &self.topic
    }

    /// Test `msg` and forward it when it matches. Returns whether it matched.
    ///
    /// A failing test counts as "no match" before polarity is applied.
    pub async fn invoke(&self, mut msg: Message) -> bool {
        debug!(rule = %self.rule, filter = %self.topic, "Received message");

        let result = match self.predicate.test(&mut msg).await {
            Ok(result) => result,
            Err(e) => {
                error!(rule = %self.rule, filter = %self.topic, "{e}");
                false
            }
        };

        let matched = self.polarity.apply(result);
        if matched {
            debug!(rule = %self.rule, filter = %self.topic, "Filter matched");
            self.propagate(msg).await;
        }
        matched
    }

    async fn propagate(&self, mut msg: Message) {
        msg.set_extra(RULE_NAME_KEY, self.rule.clone());
        self.bus.publish(&self.topic, msg).await;
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("rule", &self.rule)
            .field("identifier", &self.topic)
            .field("polarity", &self.polarity)
            .finish()
    }
}

#[async_trait]
impl Subscriber for Filter {
    async fn receive(&self, msg: Message) {
        self.invoke(msg).await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    pub(crate) struct Fixed(pub Result<bool, &'static str>);

    #[async_trait]
    impl Predicate for Fixed {
        async fn test(&self, msg: &mut Message) -> Result<bool, FilterError> {
            msg.set_message("rewritten");
            self.0.map_err(|reason| FilterError::Failed {
                name: "fixed".into(),
                reason: reason.into(),
            })
        }
    }

    #[derive(Default)]
    pub(crate) struct Sink {
        pub seen: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl Subscriber for Sink {
        async fn receive(&self, msg: Message) {
            self.seen.lock().unwrap().push(msg);
        }
    }

    async fn run(result: Result<bool, &'static str>, negate: bool) -> (bool, Vec<Message>) {
        let bus = Bus::new();
        let filter = Filter::new(
            "rule1",
            "fixedfilter",
            Box::new(Fixed(result)),
            Polarity::from_negate(negate),
            Arc::clone(&bus),
        );
        let sink = Arc::new(Sink::default());
        bus.subscribe(filter.identifier().clone(), sink.clone()).await;

        let matched = filter.invoke(Message::new("original")).await;
        let seen = sink.seen.lock().unwrap().clone();
        (matched, seen)
    }

    #[tokio::test]
    async fn matched_is_negate_xor_result() {
        for (result, negate, expected) in [
            (true, false, true),
            (false, false, false),
            (true, true, false),
            (false, true, true),
        ] {
            let (matched, seen) = run(Ok(result), negate).await;
            assert_eq!(matched, expected, "result={result} negate={negate}");
            assert_eq!(seen.len(), usize::from(expected));
        }
    }

    #[tokio::test]
    async fn forwarded_message_carries_rule_name_and_rewrite() {
        let (_, seen) = run(Ok(true), false).await;
        assert_eq!(seen[0].extra(RULE_NAME_KEY), Some("rule1"));
        assert_eq!(seen[0].message(), "rewritten");
    }

    #[tokio::test]
    async fn test_error_counts_as_no_match() {
        let (matched, seen) = run(Err("boom"), false).await;
        assert!(!matched);
        assert!(seen.is_empty());

        // Negated filters forward on error, since the error reads as "false".
        let (matched, seen) = run(Err("boom"), true).await;
        assert!(matched);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn identifiers_are_unique_across_instances_of_one_kind() {
        let bus = Bus::new();
        let ids: HashSet<Topic> = (0..100)
            .map(|_| {
                Filter::new(
                    "r",
                    "fixedfilter",
                    Box::new(Fixed(Ok(true))),
                    Polarity::Direct,
                    Arc::clone(&bus),
                )
                .identifier()
                .clone()
            })
            .collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn identifier_is_kind_colon_id() {
        let filter = Filter::new("r", "fixedfilter", Box::new(Fixed(Ok(true))), Polarity::Direct, Bus::new());
        assert_eq!(filter.identifier().as_str(), format!("fixedfilter:{}", filter.id()));
    }
}
