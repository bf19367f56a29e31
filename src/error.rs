//! Error types for driplane.

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Feeder error: {0}")]
    Feeder(#[from] FeederError),

    #[error("Network error: {0}")]
    Net(#[from] NetError),

    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl std::fmt::Display) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}

/// Template compilation and rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template {name} failed to compile: {reason}")]
    Syntax { name: String, reason: String },

    #[error("Template {name} failed to render: {reason}")]
    Render { name: String, reason: String },
}

/// Kind registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{kind} factory with the same name already exists")]
    Duplicate { kind: String },

    #[error("{kind} doesn't exist")]
    UnknownKind { kind: String },

    #[error("Failed to build {kind}: {source}")]
    Construction {
        kind: String,
        #[source]
        source: ConfigError,
    },
}

/// Errors raised while a filter tests a message.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Network error: {0}")]
    Net(#[from] NetError),

    #[error("Filter {name} failed: {reason}")]
    Failed { name: String, reason: String },
}

/// Feeder lifecycle and pass errors.
#[derive(Debug, thiserror::Error)]
pub enum FeederError {
    #[error("Feeder {name} cannot {action} while {state}")]
    InvalidState {
        name: String,
        action: &'static str,
        state: &'static str,
    },

    #[error("unexpected status: {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Network error: {0}")]
    Net(#[from] NetError),

    #[error("Feeder {name} pass failed: {reason}")]
    Failed { name: String, reason: String },
}

/// Outbound HTTP errors.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the script capability bridge.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("wrong data type: {0}")]
    UnsupportedPayload(String),

    #[error("Network error: {0}")]
    Net(#[from] NetError),

    #[error("File error on {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
