//! Filter kind registry.
//!
//! Kinds are registered on a builder during startup; the built registry is
//! read-only, so nothing can be registered once rules start loading.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::bus::Bus;
use crate::config::Params;
use crate::error::{ConfigError, RegistryError};
use crate::filters::base::{Filter, Polarity, Predicate};
use crate::net::HttpClient;

/// Builds a filter kind's predicate from its untyped configuration.
pub type FilterFactory =
    Arc<dyn Fn(&Params, &HttpClient) -> Result<Box<dyn Predicate>, ConfigError> + Send + Sync>;

/// Startup-phase registry.
#[derive(Default)]
pub struct FilterRegistryBuilder {
    factories: HashMap<String, FilterFactory>,
}

impl FilterRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind under `<name>filter`. Duplicate names are rejected.
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<&mut Self, RegistryError>
    where
        F: Fn(&Params, &HttpClient) -> Result<Box<dyn Predicate>, ConfigError> + Send + Sync + 'static,
    {
        let kind = format!("{name}filter");
        if self.factories.contains_key(&kind) {
            return Err(RegistryError::Duplicate { kind });
        }
        debug!(kind = %kind, "Registered filter kind");
        self.factories.insert(kind, Arc::new(factory));
        Ok(self)
    }

    /// Register every built-in kind.
    pub fn with_builtins(mut self) -> Result<Self, RegistryError> {
        self.register("http", |params: &Params, http: &HttpClient| {
            let filter: Box<dyn Predicate> =
                Box::new(super::http::HttpFilter::new(params, http.clone())?);
            Ok(filter)
        })?;
        Ok(self)
    }

    pub fn build(self, http: HttpClient) -> FilterRegistry {
        FilterRegistry {
            factories: self.factories,
            http,
        }
    }
}

/// Read-only mapping from kind name to factory.
pub struct FilterRegistry {
    factories: HashMap<String, FilterFactory>,
    http: HttpClient,
}

impl FilterRegistry {
    /// Registry holding only the built-in kinds.
    pub fn builtin(http: HttpClient) -> Result<Self, RegistryError> {
        Ok(FilterRegistryBuilder::new().with_builtins()?.build(http))
    }

    pub fn has(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Construct a `kind` filter for `rule`. All configuration is validated here.
    pub fn create(
        &self,
        rule: &str,
        kind: &str,
        params: &Params,
        bus: Arc<Bus>,
        negate: bool,
    ) -> Result<Arc<Filter>, RegistryError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| RegistryError::UnknownKind {
                kind: format!("filter '{kind}'"),
            })?;
        let predicate = factory(params, &self.http).map_err(|source| RegistryError::Construction {
            kind: kind.to_string(),
            source,
        })?;

        let filter = Filter::new(rule, kind, predicate, Polarity::from_negate(negate), bus);
        debug!(rule = %rule, filter = %filter.identifier(), negate, "Created filter");
        Ok(Arc::new(filter))
    }
}
