//! Precompiled placeholders rendered against a message.
//!
//! The message body is exposed as `text` and every extra under its own key,
//! so `{{ text }}` or `{{ title }}` resolve against whatever the upstream
//! stage produced. References to fields that do not exist are render errors.

use std::collections::BTreeMap;

use minijinja::{AutoEscape, Environment, UndefinedBehavior};

use crate::error::TemplateError;
use crate::message::Message;

/// Name under which the message body is exposed to templates.
pub const BODY_FIELD: &str = "text";

/// An immutable compiled template.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    env: Environment<'static>,
}

impl Template {
    /// Compile `source`. Syntax errors are reported here, not at render time.
    pub fn compile(name: impl Into<String>, source: impl Into<String>) -> Result<Self, TemplateError> {
        let name = name.into();
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        // Values go into URLs and request bodies, never into markup.
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_template_owned(name.clone(), source.into())
            .map_err(|e| TemplateError::Syntax {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self { name, env })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render against the message's body and extras.
    pub fn render(&self, msg: &Message) -> Result<String, TemplateError> {
        let mut ctx: BTreeMap<&str, &str> = msg
            .extras()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        ctx.insert(BODY_FIELD, msg.message());

        self.env
            .get_template(&self.name)
            .and_then(|t| t.render(&ctx))
            .map_err(|e| TemplateError::Render {
                name: self.name.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_text_is_returned_unchanged() {
        let t = Template::compile("literal", "http://example.com/feed?x=1\n").unwrap();
        let mut msg = Message::new("whatever the body is");
        msg.set_extra("title", "ignored");
        assert_eq!(t.render(&msg).unwrap(), "http://example.com/feed?x=1\n");
        assert_eq!(t.render(&Message::default()).unwrap(), "http://example.com/feed?x=1\n");
    }

    #[test]
    fn markup_like_names_do_not_escape_values() {
        let msg = Message::new(r#"a<b & "c""#);
        for name in ["x.html", "x.htm", "x.xml", "plain"] {
            let t = Template::compile(name, "{{ text }}").unwrap();
            assert_eq!(t.render(&msg).unwrap(), r#"a<b & "c""#, "template {name}");
        }
    }

    #[test]
    fn renders_body_and_extras() {
        let t = Template::compile("url", "https://x.test/{{ title }}?q={{ text }}").unwrap();
        let mut msg = Message::new("body");
        msg.set_extra("title", "post");
        assert_eq!(t.render(&msg).unwrap(), "https://x.test/post?q=body");
    }

    #[test]
    fn body_shadows_extra_named_text() {
        let t = Template::compile("shadow", "{{ text }}").unwrap();
        let mut msg = Message::new("body");
        msg.set_extra("text", "extra");
        assert_eq!(t.render(&msg).unwrap(), "body");
    }

    #[test]
    fn unresolved_field_is_an_error() {
        let t = Template::compile("missing", "{{ nope }}").unwrap();
        let err = t.render(&Message::new("x")).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[test]
    fn malformed_template_fails_to_compile() {
        let err = Template::compile("broken", "{{ text ").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[test]
    fn message_apply_placeholder_delegates() {
        let t = Template::compile("p", "[{{ text }}]").unwrap();
        assert_eq!(Message::new("a").apply_placeholder(&t).unwrap(), "[a]");
    }
}
