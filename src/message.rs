//! The unit of data flowing through a rule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::template::Template;

/// Extra key the engine sets to the name of the rule a message matched in.
pub const RULE_NAME_KEY: &str = "rule_name";

/// Text body plus string-keyed metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    body: String,
    extra: BTreeMap<String, String>,
}

impl Message {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(body: impl Into<String>, extra: BTreeMap<String, String>) -> Self {
        Self {
            body: body.into(),
            extra,
        }
    }

    pub fn set_message(&mut self, text: impl Into<String>) {
        self.body = text.into();
    }

    pub fn message(&self) -> &str {
        &self.body
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra.insert(key.into(), value.into());
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    /// All metadata entries, ordered by key.
    pub fn extras(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    /// Render `template` against this message's body and extras.
    pub fn apply_placeholder(&self, template: &Template) -> Result<String, TemplateError> {
        template.render(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extras_are_case_sensitive_and_unique() {
        let mut msg = Message::new("hello");
        msg.set_extra("Key", "a");
        msg.set_extra("key", "b");
        msg.set_extra("key", "c");

        assert_eq!(msg.extra("Key"), Some("a"));
        assert_eq!(msg.extra("key"), Some("c"));
        assert_eq!(msg.extras().len(), 2);
        assert_eq!(msg.extra("missing"), None);
    }

    #[test]
    fn set_message_replaces_body() {
        let mut msg = Message::new("old");
        msg.set_message("new");
        assert_eq!(msg.message(), "new");
    }
}
