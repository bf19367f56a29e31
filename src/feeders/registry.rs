//! Feeder kind registry, sealed after startup like the filter registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::bus::{Bus, Topic};
use crate::config::Params;
use crate::error::{ConfigError, RegistryError};
use crate::feeders::base::{Feed, Feeder};
use crate::net::HttpClient;

/// Builds a feeder kind's source from its untyped configuration.
pub type FeederFactory =
    Arc<dyn Fn(&Params, &HttpClient) -> Result<Arc<dyn Feed>, ConfigError> + Send + Sync>;

#[derive(Default)]
pub struct FeederRegistryBuilder {
    factories: HashMap<String, FeederFactory>,
}

impl FeederRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind under `<name>feeder`. Duplicate names are rejected.
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<&mut Self, RegistryError>
    where
        F: Fn(&Params, &HttpClient) -> Result<Arc<dyn Feed>, ConfigError> + Send + Sync + 'static,
    {
        let kind = format!("{name}feeder");
        if self.factories.contains_key(&kind) {
            return Err(RegistryError::Duplicate { kind });
        }
        debug!(kind = %kind, "Registered feeder kind");
        self.factories.insert(kind, Arc::new(factory));
        Ok(self)
    }

    pub fn with_builtins(mut self) -> Result<Self, RegistryError> {
        self.register("web", |params: &Params, http: &HttpClient| {
            let feed: Arc<dyn Feed> = Arc::new(super::web::WebFeed::new(params, http.clone())?);
            Ok(feed)
        })?;
        Ok(self)
    }

    pub fn build(self, http: HttpClient) -> FeederRegistry {
        FeederRegistry {
            factories: self.factories,
            http,
        }
    }
}

pub struct FeederRegistry {
    factories: HashMap<String, FeederFactory>,
    http: HttpClient,
}

impl FeederRegistry {
    pub fn builtin(http: HttpClient) -> Result<Self, RegistryError> {
        Ok(FeederRegistryBuilder::new().with_builtins()?.build(http))
    }

    pub fn has(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Construct a `kind` feeder for `rule` that publishes on `topic`.
    pub fn create(
        &self,
        rule: &str,
        kind: &str,
        params: &Params,
        bus: Arc<Bus>,
        topic: Topic,
    ) -> Result<Arc<Feeder>, RegistryError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| RegistryError::UnknownKind {
                kind: format!("feeder '{kind}'"),
            })?;
        let construction = |source| RegistryError::Construction {
            kind: kind.to_string(),
            source,
        };

        let feed = factory(params, &self.http).map_err(construction)?;
        let feeder = Feeder::new(rule, kind, feed, bus, topic).map_err(construction)?;
        debug!(rule = %rule, feeder = %kind, topic = %feeder.topic(), "Created feeder");
        Ok(Arc::new(feeder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn http() -> HttpClient {
        HttpClient::new(&EngineConfig::default()).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn builtins_include_web() {
        let registry = FeederRegistry::builtin(http()).unwrap();
        assert_eq!(registry.kinds(), vec!["webfeeder"]);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let err = FeederRegistryBuilder::new()
            .with_builtins()
            .unwrap()
            .with_builtins()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::Duplicate { .. }));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let registry = FeederRegistry::builtin(http()).unwrap();
        let err = registry
            .create("r", "rssfeeder", &Params::new(), Bus::new(), Topic::named("t"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownKind { .. }));
    }

    #[test]
    fn malformed_frequency_fails_create() {
        let registry = FeederRegistry::builtin(http()).unwrap();
        let err = registry
            .create(
                "r",
                "webfeeder",
                &params(&[("web.url", "http://x/"), ("web.freq", "abc")]),
                Bus::new(),
                Topic::named("t"),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::Construction { .. }));
    }

    #[test]
    fn zero_frequency_fails_create() {
        let registry = FeederRegistry::builtin(http()).unwrap();
        let result = registry.create(
            "r",
            "webfeeder",
            &params(&[("web.url", "http://x/"), ("web.freq", "0s")]),
            Bus::new(),
            Topic::named("t"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn created_feeder_is_idle() {
        let registry = FeederRegistry::builtin(http()).unwrap();
        let feeder = registry
            .create(
                "r",
                "webfeeder",
                &params(&[("web.url", "http://x/"), ("web.freq", "5m")]),
                Bus::new(),
                Topic::named("t"),
            )
            .unwrap();
        assert!(!feeder.is_running());
        assert_eq!(feeder.frequency(), std::time::Duration::from_secs(300));
        assert_eq!(feeder.topic(), &Topic::named("t"));
    }
}
