//! Configuration types and per-instance parameter parsing.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigError;

/// String-keyed configuration handed to every filter and feeder constructor.
pub type Params = HashMap<String, String>;

/// Process-wide engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Timeout applied to every outbound HTTP request.
    pub http_timeout: Duration,
    /// User-Agent header sent with outbound requests.
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            user_agent: format!("driplane/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl EngineConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let http_timeout = std::env::var("DRIPLANE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_timeout);
        let user_agent = std::env::var("DRIPLANE_USER_AGENT").unwrap_or(defaults.user_agent);

        Self {
            http_timeout,
            user_agent,
        }
    }
}

/// `true` only when the key is present and set to the literal `"true"`.
pub fn flag(params: &Params, key: &str) -> bool {
    params.get(key).is_some_and(|v| v == "true")
}

/// Parse an optional integer parameter.
pub fn int(params: &Params, key: &str) -> Result<Option<i64>, ConfigError> {
    params
        .get(key)
        .map(|v| {
            v.trim()
                .parse::<i64>()
                .map_err(|e| ConfigError::invalid(key, format!("'{v}': {e}")))
        })
        .transpose()
}

/// Parse an optional HTTP status parameter. `0` is allowed.
pub fn status(params: &Params, key: &str) -> Result<Option<u16>, ConfigError> {
    match int(params, key)? {
        None => Ok(None),
        Some(n) => u16::try_from(n)
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, format!("status {n} out of range"))),
    }
}

/// Parse an optional JSON object of string values.
pub fn json_map(params: &Params, key: &str) -> Result<Option<Vec<(String, String)>>, ConfigError> {
    let Some(raw) = params.get(key) else {
        return Ok(None);
    };
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ConfigError::invalid(key, e))?;
    let serde_json::Value::Object(obj) = value else {
        return Err(ConfigError::invalid(key, "expected a JSON object"));
    };

    let mut entries = Vec::with_capacity(obj.len());
    for (k, v) in obj {
        match v {
            serde_json::Value::String(s) => entries.push((k, s)),
            other => {
                return Err(ConfigError::invalid(
                    key,
                    format!("value of '{k}' must be a string, got {other}"),
                ));
            }
        }
    }
    Ok(Some(entries))
}

/// Parse an optional duration parameter.
pub fn duration(params: &Params, key: &str) -> Result<Option<Duration>, ConfigError> {
    params
        .get(key)
        .map(|v| {
            parse_duration(v).map_err(|reason| {
                ConfigError::invalid(key, format!("specified frequency cannot be parsed '{v}': {reason}"))
            })
        })
        .transpose()
}

/// Parse a duration string such as `300ms`, `1.5s`, `2m` or `1h30m`.
///
/// Accepted units: `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`. A bare `0` is accepted.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".into());
    }
    if s.starts_with('-') {
        return Err("negative duration".into());
    }
    let s = s.strip_prefix('+').unwrap_or(s);
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(format!("invalid duration '{input}'"));
        }
        let number: f64 = rest[..num_len]
            .parse()
            .map_err(|_| format!("invalid duration '{input}'"))?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            "" => return Err(format!("missing unit in duration '{input}'")),
            unit => return Err(format!("unknown unit '{unit}' in duration '{input}'")),
        };
        rest = &rest[unit_len..];
        total_nanos += number * scale;
    }

    let total_nanos = total_nanos.round();
    if !total_nanos.is_finite() || total_nanos >= u64::MAX as f64 {
        return Err(format!("duration '{input}' is out of range"));
    }
    Ok(Duration::from_nanos(total_nanos as u64))
}
