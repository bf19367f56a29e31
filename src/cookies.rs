//! Netscape-format cookie files.
//!
//! Cookie values are held as secrets and never reach the logs; only cookie
//! names are reported.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Cookie {
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// Unix timestamp, 0 for session cookies.
    pub expires: i64,
    pub name: String,
    pub value: SecretString,
}

/// Load cookies from a file at `path`.
pub fn load_cookie_file(path: impl AsRef<Path>) -> Result<Vec<Cookie>, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let cookies = parse_cookies(&contents).map_err(|message| ConfigError::InvalidValue {
        key: path.display().to_string(),
        message,
    })?;
    debug!(
        path = %path.display(),
        names = ?cookies.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        "Loaded cookies"
    );
    Ok(cookies)
}

/// Parse the tab-separated Netscape cookie format.
pub fn parse_cookies(contents: &str) -> Result<Vec<Cookie>, String> {
    let mut cookies = Vec::new();
    for (lineno, raw) in contents.lines().enumerate() {
        let mut line = raw.trim_end_matches(['\r', '\n']);
        let mut http_only = false;
        if let Some(rest) = line.strip_prefix("#HttpOnly_") {
            http_only = true;
            line = rest;
        } else if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 7 {
            return Err(format!(
                "line {}: expected 7 tab-separated fields, got {}",
                lineno + 1,
                fields.len()
            ));
        }
        let expires = fields[4]
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("line {}: invalid expiry: {e}", lineno + 1))?;

        cookies.push(Cookie {
            domain: fields[0].to_string(),
            path: fields[2].to_string(),
            secure: fields[3].eq_ignore_ascii_case("TRUE"),
            http_only,
            expires,
            name: fields[5].to_string(),
            value: SecretString::from(fields[6].to_string()),
        });
    }
    Ok(cookies)
}

/// Render a `Cookie` request header value.
pub fn cookie_header(cookies: &[Cookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value.expose_secret()))
            .collect::<Vec<_>>()
            .join("; "),
    )
}
