//! `httpfilter`: issue a request built from the incoming message and match on
//! the response status.
//!
//! Recognised options:
//! - `url_from_input` (`"true"`): use the message body as the URL
//! - `url`: URL template, required unless `url_from_input` is set
//! - `method`: default `GET`
//! - `headers`: JSON object of header values
//! - `data`: JSON object of form field templates (wins over `rawData`)
//! - `rawData`: raw body template
//! - `status`: expected status, default 200, compared for equality
//! - `getBody` (`"false"`): keep the message body instead of replacing it
//!   with the response body on match

use async_trait::async_trait;
use tracing::debug;

use crate::config::{self, Params};
use crate::error::{ConfigError, FilterError};
use crate::filters::base::Predicate;
use crate::message::Message;
use crate::net::{HttpClient, Payload};
use crate::template::Template;

const DEFAULT_STATUS: u16 = 200;

#[derive(Debug)]
pub struct HttpFilter {
    url_from_input: bool,
    url: Option<Template>,
    method: String,
    headers: Vec<(String, String)>,
    data: Vec<(String, Template)>,
    raw_data: Option<Template>,
    check_status: u16,
    get_body: bool,
    client: HttpClient,
}

impl HttpFilter {
    pub fn new(params: &Params, client: HttpClient) -> Result<Self, ConfigError> {
        let url_from_input = config::flag(params, "url_from_input");

        let url = params
            .get("url")
            .map(|v| compile("url", "httpFilterUrlString", v))
            .transpose()?;
        if !url_from_input && url.is_none() {
            return Err(ConfigError::MissingRequired { key: "url".into() });
        }

        let data = config::json_map(params, "data")?
            .unwrap_or_default()
            .into_iter()
            .map(|(field, source)| -> Result<(String, Template), ConfigError> {
                let t = compile("data", &format!("httpFilterdataPost{field}"), &source)?;
                Ok((field, t))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let raw_data = params
            .get("rawData")
            .map(|v| compile("rawData", "httpFilterRawData", v))
            .transpose()?;

        Ok(Self {
            url_from_input,
            url,
            method: params.get("method").cloned().unwrap_or_else(|| "GET".into()),
            headers: config::json_map(params, "headers")?.unwrap_or_default(),
            data,
            raw_data,
            check_status: config::status(params, "status")?.unwrap_or(DEFAULT_STATUS),
            get_body: params.get("getBody").is_none_or(|v| v != "false"),
            client,
        })
    }

    fn resolve_url(&self, msg: &Message) -> Result<String, FilterError> {
        match (&self.url, self.url_from_input) {
            (_, true) | (None, _) => Ok(msg.message().to_string()),
            (Some(t), false) => Ok(msg.apply_placeholder(t)?),
        }
    }

    fn resolve_payload(&self, msg: &Message) -> Result<Payload, FilterError> {
        if !self.data.is_empty() {
            let fields = self
                .data
                .iter()
                .map(|(field, t)| -> Result<(String, String), FilterError> {
                    Ok((field.clone(), msg.apply_placeholder(t)?))
                })
                .collect::<Result<Vec<_>, FilterError>>()?;
            return Ok(Payload::Form(fields));
        }
        match &self.raw_data {
            Some(t) => Ok(Payload::Text(msg.apply_placeholder(t)?)),
            None => Ok(Payload::Empty),
        }
    }
}

fn compile(key: &str, name: &str, source: &str) -> Result<Template, ConfigError> {
    Template::compile(name, source).map_err(|e| ConfigError::invalid(key, e))
}

#[async_trait]
impl Predicate for HttpFilter {
    async fn test(&self, msg: &mut Message) -> Result<bool, FilterError> {
        let url = self.resolve_url(msg)?;
        let payload = self.resolve_payload(msg)?;

        let resp = self
            .client
            .send(&self.method, &url, &self.headers, payload)
            .await?;
        debug!(status = %resp.status_line(), url = %url, "[httpfilter] response");

        if resp.status.as_u16() != self.check_status {
            return Ok(false);
        }
        if self.get_body {
            msg.set_message(resp.text());
        }
        Ok(true)
    }
}
