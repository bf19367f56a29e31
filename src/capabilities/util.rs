//! `util` capability.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};

#[derive(Debug, Clone, Copy, Default)]
pub struct UtilCapability;

impl UtilCapability {
    /// Suspend the calling script. Negative or non-finite values do nothing.
    pub async fn sleep(&self, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        }
    }

    /// Value of an environment variable, empty when unset.
    pub fn getenv(&self, name: &str) -> String {
        std::env::var(name).unwrap_or_default()
    }

    /// Current UTC time in RFC 3339.
    pub fn now(&self) -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getenv_unset_is_empty() {
        assert_eq!(UtilCapability.getenv("DRIPLANE_SURELY_UNSET_VARIABLE"), "");
    }

    #[test]
    fn now_is_rfc3339() {
        let now = UtilCapability.now();
        assert!(chrono::DateTime::parse_from_rfc3339(&now).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_ignores_bad_values() {
        let start = tokio::time::Instant::now();
        UtilCapability.sleep(-1.0).await;
        UtilCapability.sleep(f64::NAN).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        UtilCapability.sleep(2.0).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
