//! `log` capability: script output routed into the engine's tracing.

use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogCapability;

impl LogCapability {
    pub fn debug(&self, msg: &str) {
        debug!(target: "driplane::script", "{msg}");
    }

    pub fn info(&self, msg: &str) {
        info!(target: "driplane::script", "{msg}");
    }

    pub fn warning(&self, msg: &str) {
        warn!(target: "driplane::script", "{msg}");
    }

    pub fn error(&self, msg: &str) {
        error!(target: "driplane::script", "{msg}");
    }
}
