//! Host capabilities exposed to rule scripts.
//!
//! The table is fixed: `log`, `http`, `file`, `util` and `strings`. It is
//! installed once at startup and is the only way scripts reach the outside
//! world.

pub mod file;
pub mod http;
pub mod log;
pub mod strings;
pub mod util;

use std::sync::OnceLock;

pub use file::{FileCapability, FileResult};
pub use http::{HttpCapability, HttpResult, StatusInfo, payload_from_value};
pub use log::LogCapability;
pub use strings::StringsCapability;
pub use util::UtilCapability;

use crate::net::HttpClient;

/// Names under which the capabilities are visible to scripts.
pub const CAPABILITY_NAMES: [&str; 5] = ["log", "http", "file", "util", "strings"];

static DEFINITIONS: OnceLock<Capabilities> = OnceLock::new();

/// A borrowed entry of the capability table.
#[derive(Debug, Clone, Copy)]
pub enum Capability<'a> {
    Log(&'a LogCapability),
    Http(&'a HttpCapability),
    File(&'a FileCapability),
    Util(&'a UtilCapability),
    Strings(&'a StringsCapability),
}

/// The capability table.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub log: LogCapability,
    pub http: HttpCapability,
    pub file: FileCapability,
    pub util: UtilCapability,
    pub strings: StringsCapability,
}

impl Capabilities {
    pub fn new(client: HttpClient) -> Self {
        Self {
            log: LogCapability,
            http: HttpCapability::new(client),
            file: FileCapability,
            util: UtilCapability,
            strings: StringsCapability,
        }
    }

    /// Look up a capability by its script-visible name.
    pub fn get(&self, name: &str) -> Option<Capability<'_>> {
        match name {
            "log" => Some(Capability::Log(&self.log)),
            "http" => Some(Capability::Http(&self.http)),
            "file" => Some(Capability::File(&self.file)),
            "util" => Some(Capability::Util(&self.util)),
            "strings" => Some(Capability::Strings(&self.strings)),
            _ => None,
        }
    }
}

/// Install the process-wide table. Only the first call succeeds; later calls
/// get the table that is already installed as their error.
pub fn install(capabilities: Capabilities) -> Result<&'static Capabilities, &'static Capabilities> {
    let mut installed_now = false;
    let table = DEFINITIONS.get_or_init(|| {
        installed_now = true;
        capabilities
    });
    if installed_now { Ok(table) } else { Err(table) }
}

/// The installed table, if startup has installed one.
pub fn definitions() -> Option<&'static Capabilities> {
    DEFINITIONS.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn table() -> Capabilities {
        Capabilities::new(HttpClient::new(&EngineConfig::default()).unwrap())
    }

    #[test]
    fn every_name_resolves() {
        let caps = table();
        for name in CAPABILITY_NAMES {
            assert!(caps.get(name).is_some(), "{name} missing");
        }
        assert!(caps.get("os").is_none());
        assert!(matches!(caps.get("http"), Some(Capability::Http(_))));
    }

    #[test]
    fn install_happens_once() {
        let first = install(table()).unwrap_or_else(|existing| existing);
        assert!(std::ptr::eq(first, definitions().unwrap()));

        let again = install(table()).unwrap_err();
        assert!(std::ptr::eq(again, first));
    }
}
