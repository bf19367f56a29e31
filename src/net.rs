//! Shared outbound HTTP plumbing for feeders, filters and the script bridge.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::NetError;

/// Request body shapes. Anything else must be converted before it gets here.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    Text(String),
    Form(Vec<(String, String)>),
    Raw(Bytes),
}

impl Payload {
    /// Pick the body for a stage configured with an optional form map and an
    /// optional raw body. A non-empty form wins when both are present.
    pub fn choose(form: Option<Vec<(String, String)>>, raw: Option<String>) -> Self {
        match (form, raw) {
            (Some(fields), _) if !fields.is_empty() => Payload::Form(fields),
            (_, Some(text)) if !text.is_empty() => Payload::Text(text),
            _ => Payload::Empty,
        }
    }
}

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// `200 OK` style status line.
    pub fn status_line(&self) -> String {
        status_line(self.status)
    }
}

pub fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

/// Thin wrapper over a shared `reqwest::Client`. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &EngineConfig) -> Result<Self, NetError> {
        let inner = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { inner })
    }

    /// Build a request. An empty method means GET.
    pub fn request(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        payload: Payload,
    ) -> Result<reqwest::RequestBuilder, NetError> {
        let method = parse_method(method)?;
        let url = reqwest::Url::parse(url)
            .map_err(|e| NetError::InvalidRequest(format!("invalid url '{url}': {e}")))?;
        let header_map = header_map(headers)?;

        let builder = self.inner.request(method, url);
        let builder = match payload {
            Payload::Empty => builder,
            Payload::Text(text) => builder.body(text),
            Payload::Form(fields) => builder.form(&fields),
            Payload::Raw(raw) => builder.body(raw),
        };
        // Caller headers go last so they override any body-derived Content-Type.
        Ok(builder.headers(header_map))
    }

    /// Send and read the whole body.
    pub async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<Response, NetError> {
        let resp = builder.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        debug!(status = %status, url = %resp.url(), "HTTP response");
        let body = resp.bytes().await?;
        Ok(Response {
            status,
            headers,
            body,
        })
    }

    /// Build, send, and read in one step.
    pub async fn send(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        payload: Payload,
    ) -> Result<Response, NetError> {
        let builder = self.request(method, url, headers, payload)?;
        self.execute(builder).await
    }
}

fn parse_method(method: &str) -> Result<Method, NetError> {
    if method.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(method.as_bytes())
        .map_err(|_| NetError::InvalidRequest(format!("invalid method '{method}'")))
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, NetError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| NetError::InvalidRequest(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| NetError::InvalidRequest(format!("invalid value for header {name}: {e}")))?;
        map.append(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpClient {
        HttpClient::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn form_wins_over_raw() {
        let form = vec![("a".to_string(), "1".to_string())];
        assert_eq!(
            Payload::choose(Some(form.clone()), Some("raw".into())),
            Payload::Form(form)
        );
        assert_eq!(
            Payload::choose(Some(vec![]), Some("raw".into())),
            Payload::Text("raw".into())
        );
        assert_eq!(Payload::choose(None, None), Payload::Empty);
    }

    #[test]
    fn empty_method_defaults_to_get() {
        let req = client()
            .request("", "http://localhost/", &[], Payload::Empty)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(req.method(), &Method::GET);
    }

    #[test]
    fn form_payload_is_urlencoded() {
        let req = client()
            .request(
                "POST",
                "http://localhost/",
                &[],
                Payload::Form(vec![("q".into(), "a b".into())]),
            )
            .unwrap()
            .build()
            .unwrap();
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, b"q=a+b");
        assert_eq!(
            req.headers().get("content-type").unwrap(),
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn caller_headers_override_content_type() {
        let req = client()
            .request(
                "POST",
                "http://localhost/",
                &[("Content-Type".into(), "text/plain".into())],
                Payload::Form(vec![("q".into(), "1".into())]),
            )
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(req.headers().get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn invalid_inputs_are_request_errors() {
        let c = client();
        assert!(matches!(
            c.request("GET", "not a url", &[], Payload::Empty),
            Err(NetError::InvalidRequest(_))
        ));
        assert!(matches!(
            c.request("BAD METHOD", "http://localhost/", &[], Payload::Empty),
            Err(NetError::InvalidRequest(_))
        ));
        assert!(matches!(
            c.request("GET", "http://localhost/", &[("bad name".into(), "v".into())], Payload::Empty),
            Err(NetError::InvalidRequest(_))
        ));
    }
}
