//! `webfeeder`: poll a URL and publish the page as a message.
//!
//! Recognised options:
//! - `web.url` (required)
//! - `web.freq`: poll frequency, default `60s`
//! - `web.text_only` (`"true"`): strip markup from the body
//! - `web.method`: default `GET`
//! - `web.headers`: JSON object of header values
//! - `web.data`: JSON object sent form-encoded (wins over `web.rawData`)
//! - `web.rawData`: raw request body
//! - `web.status`: expected status, `0` (default) accepts any
//! - `web.cookies`: path to a Netscape-format cookie file

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::{self, Params};
use crate::cookies::{self, Cookie};
use crate::error::{ConfigError, FeederError};
use crate::feeders::base::Feed;
use crate::html;
use crate::message::Message;
use crate::net::{HttpClient, Payload};

const DEFAULT_FREQUENCY: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct WebFeed {
    url: String,
    frequency: Duration,
    text_only: bool,
    check_status: u16,
    method: String,
    headers: Vec<(String, String)>,
    payload: Payload,
    cookies: Vec<Cookie>,
    client: HttpClient,
}

impl WebFeed {
    pub fn new(params: &Params, client: HttpClient) -> Result<Self, ConfigError> {
        let url = params
            .get("web.url")
            .cloned()
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "web.url".into(),
            })?;

        let cookies = match params.get("web.cookies") {
            Some(path) => cookies::load_cookie_file(path)?,
            None => Vec::new(),
        };

        Ok(Self {
            url,
            frequency: config::duration(params, "web.freq")?.unwrap_or(DEFAULT_FREQUENCY),
            text_only: config::flag(params, "web.text_only"),
            check_status: config::status(params, "web.status")?.unwrap_or(0),
            method: params.get("web.method").cloned().unwrap_or_else(|| "GET".into()),
            headers: config::json_map(params, "web.headers")?.unwrap_or_default(),
            payload: Payload::choose(
                config::json_map(params, "web.data")?,
                params.get("web.rawData").cloned(),
            ),
            cookies,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn status_matches(&self, status: u16) -> bool {
        self.check_status == 0 || self.check_status == status
    }

    fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers = self.headers.clone();
        if let Some(cookie) = cookies::cookie_header(&self.cookies) {
            debug!(
                url = %self.url,
                cookies = ?self.cookies.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                "Attaching cookies"
            );
            headers.push(("Cookie".into(), cookie));
        }
        headers
    }
}

#[async_trait]
impl Feed for WebFeed {
    fn frequency(&self) -> Duration {
        self.frequency
    }

    async fn parse_feed(&self) -> Result<Vec<Message>, FeederError> {
        debug!(url = %self.url, "Start web parsing");
        let resp = self
            .client
            .send(&self.method, &self.url, &self.request_headers(), self.payload.clone())
            .await?;

        let mut text = resp.text();
        let meta = html::meta_from_html(&text);
        debug!(status = %resp.status_line(), url = %self.url, "Web response");

        if !self.status_matches(resp.status.as_u16()) {
            return Err(FeederError::UnexpectedStatus {
                status: resp.status.as_u16(),
            });
        }
        if self.text_only {
            text = html::text_from_html(&text);
        }

        let extra = BTreeMap::from([
            ("url".to_string(), self.url.clone()),
            ("title".to_string(), meta.title),
            ("description".to_string(), meta.description),
            ("image".to_string(), meta.image),
            ("sitename".to_string(), meta.site_name),
        ]);
        Ok(vec![Message::with_extra(text, extra)])
    }
}
