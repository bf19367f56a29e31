//! Rule composition.
//!
//! A rule is one feeder followed by an ordered chain of filters. The
//! feeder publishes on its own topic, stage 0 subscribes to it, and every
//! later stage subscribes to the identifier of the stage before it. All
//! components are constructed before anything is wired, so a rule with a
//! bad option leaves no subscriptions behind.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bus::{Bus, Topic, next_sequence};
use crate::config::Params;
use crate::error::{ConfigError, Error, FeederError, RegistryError};
use crate::feeders::{Feeder, FeederRegistry};
use crate::filters::{Filter, FilterRegistry};

/// A set of rules, as read from a JSON manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub rules: Vec<RuleSpec>,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub feeder: FeederSpec,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeederSpec {
    pub kind: String,
    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: String,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub negate: bool,
}

/// A loaded and wired rule.
#[derive(Debug)]
pub struct Rule {
    name: String,
    feeder: Arc<Feeder>,
    filters: Vec<Arc<Filter>>,
}

impl Rule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feeder(&self) -> &Arc<Feeder> {
        &self.feeder
    }

    pub fn filters(&self) -> &[Arc<Filter>] {
        &self.filters
    }

    /// Topic carrying the output of the last stage, or of the feeder when
    /// the rule has no filters.
    pub fn output(&self) -> &Topic {
        self.filters
            .last()
            .map(|f| f.identifier())
            .unwrap_or_else(|| self.feeder.topic())
    }

    pub fn start(&self) -> Result<(), FeederError> {
        self.feeder.start()
    }

    pub async fn stop(&self) -> Result<(), FeederError> {
        self.feeder.stop().await
    }
}

/// Builds rules out of the registries and wires them onto one bus.
pub struct RuleLoader<'a> {
    filters: &'a FilterRegistry,
    feeders: &'a FeederRegistry,
    bus: Arc<Bus>,
}

impl<'a> RuleLoader<'a> {
    pub fn new(filters: &'a FilterRegistry, feeders: &'a FeederRegistry, bus: Arc<Bus>) -> Self {
        Self {
            filters,
            feeders,
            bus,
        }
    }

    pub async fn load(&self, def: &RuleSpec) -> Result<Rule, RegistryError> {
        let topic = Topic::sequenced(&def.feeder.kind, next_sequence());
        let feeder = self.feeders.create(
            &def.name,
            &def.feeder.kind,
            &def.feeder.params,
            Arc::clone(&self.bus),
            topic,
        )?;

        let filters = def
            .filters
            .iter()
            .map(|f| {
                self.filters
                    .create(&def.name, &f.kind, &f.params, Arc::clone(&self.bus), f.negate)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut upstream = feeder.topic().clone();
        for filter in &filters {
            self.bus.subscribe(upstream, filter.clone()).await;
            upstream = filter.identifier().clone();
        }

        info!(
            rule = %def.name,
            feeder = %def.feeder.kind,
            stages = filters.len(),
            "Rule loaded"
        );
        Ok(Rule {
            name: def.name.clone(),
            feeder,
            filters,
        })
    }

    /// Load every rule of a manifest, stopping at the first failure.
    pub async fn load_all(&self, manifest: &Manifest) -> Result<Vec<Rule>, Error> {
        let mut rules = Vec::with_capacity(manifest.rules.len());
        for def in &manifest.rules {
            rules.push(self.load(def).await?);
        }
        Ok(rules)
    }
}
