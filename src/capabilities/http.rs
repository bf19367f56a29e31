//! `http` capability: outbound requests on behalf of rule scripts.
//!
//! Every call returns an [`HttpResult`] instead of failing, so a script can
//! inspect `error` the same way it inspects the status or the body.

use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use tokio::io::AsyncWriteExt;
use tracing::error;

use crate::error::{CapabilityError, NetError};
use crate::net::{self, HttpClient, Payload};

/// Status details of a completed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    pub code: u16,
    /// `200 OK` style status line.
    pub status: String,
    pub headers: Vec<(String, String)>,
}

/// What every `http` call hands back to the script.
#[derive(Debug, Default)]
pub struct HttpResult {
    pub error: Option<CapabilityError>,
    pub response: Option<StatusInfo>,
    pub raw: Bytes,
    pub body: String,
}

impl HttpResult {
    fn failed(err: impl Into<CapabilityError>) -> Self {
        Self {
            error: Some(err.into()),
            ..Default::default()
        }
    }

    fn from_response(resp: net::Response) -> Self {
        Self {
            error: None,
            response: Some(status_info(resp.status, &resp.headers)),
            body: resp.text(),
            raw: resp.body,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Convert a script-supplied body into a [`Payload`].
///
/// `null` is no body, a string is sent as-is, an object of strings is
/// form-encoded and an array of bytes is sent raw. Anything else is rejected.
pub fn payload_from_value(value: serde_json::Value) -> Result<Payload, CapabilityError> {
    use serde_json::Value;

    match value {
        Value::Null => Ok(Payload::Empty),
        Value::String(text) => Ok(Payload::Text(text)),
        Value::Object(obj) => obj
            .into_iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k, s)),
                other => Err(CapabilityError::UnsupportedPayload(format!(
                    "form field '{k}' is {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Payload::Form),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| CapabilityError::UnsupportedPayload(format!("{item} is not a byte")))
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(|bytes| Payload::Raw(Bytes::from(bytes))),
        other => Err(CapabilityError::UnsupportedPayload(other.to_string())),
    }
}

#[derive(Debug, Clone)]
pub struct HttpCapability {
    client: HttpClient,
}

impl HttpCapability {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub async fn request(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        payload: Payload,
    ) -> HttpResult {
        let builder = match self.client.request(method, url, &header_list(headers), payload) {
            Ok(builder) => builder,
            Err(e) => {
                error!("http.createRequest : {e}");
                return HttpResult::failed(e);
            }
        };
        match self.client.execute(builder).await {
            Ok(resp) => HttpResult::from_response(resp),
            Err(e) => HttpResult::failed(e),
        }
    }

    /// Like [`request`](Self::request), with a body of any script-supplied shape.
    pub async fn request_value(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        data: serde_json::Value,
    ) -> HttpResult {
        match payload_from_value(data) {
            Ok(payload) => self.request(method, url, headers, payload).await,
            Err(e) => {
                error!("http.createRequest : {e}");
                HttpResult::failed(e)
            }
        }
    }

    pub async fn get(&self, url: &str, headers: &HashMap<String, String>) -> HttpResult {
        self.request("GET", url, headers, Payload::Empty).await
    }

    pub async fn post(&self, url: &str, headers: &HashMap<String, String>, payload: Payload) -> HttpResult {
        self.request("POST", url, headers, payload).await
    }

    /// Stream the response body into the file at `path`. On success the
    /// result carries the status but no body.
    pub async fn download_file(
        &self,
        path: impl AsRef<Path>,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        payload: Payload,
    ) -> HttpResult {
        let path = path.as_ref();
        let builder = match self.client.request(method, url, &header_list(headers), payload) {
            Ok(builder) => builder,
            Err(e) => {
                error!("http.createRequest : {e}");
                return HttpResult::failed(e);
            }
        };
        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => return HttpResult::failed(NetError::from(e)),
        };
        let info = status_info(resp.status(), resp.headers());

        let mut out = match tokio::fs::File::create(path).await {
            Ok(file) => file,
            Err(e) => {
                error!("http.DownloadFile: {e}");
                return HttpResult::failed(file_error(path, e));
            }
        };

        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return HttpResult::failed(NetError::from(e)),
            };
            if let Err(e) = out.write_all(&chunk).await {
                error!("http.DownloadFile: {e}");
                return HttpResult::failed(file_error(path, e));
            }
        }
        if let Err(e) = out.flush().await {
            return HttpResult::failed(file_error(path, e));
        }

        HttpResult {
            response: Some(info),
            ..Default::default()
        }
    }

    /// Send the file at `file_path` as a multipart form part named
    /// `field_name`, together with `extra_fields` as plain form fields.
    pub async fn upload_file(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        extra_fields: &HashMap<String, String>,
        file_path: impl AsRef<Path>,
        field_name: &str,
    ) -> HttpResult {
        let file_path = file_path.as_ref();
        let contents = match tokio::fs::read(file_path).await {
            Ok(contents) => contents,
            Err(e) => {
                error!("http.UploadFile: {e}");
                return HttpResult::failed(file_error(file_path, e));
            }
        };
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();

        let mut form = Form::new().part(field_name.to_string(), Part::bytes(contents).file_name(file_name));
        for (key, value) in extra_fields {
            form = form.text(key.clone(), value.clone());
        }

        let builder = match self.client.request(method, url, &header_list(headers), Payload::Empty) {
            Ok(builder) => builder.multipart(form),
            Err(e) => {
                error!("http.createRequest : {e}");
                return HttpResult::failed(e);
            }
        };
        match self.client.execute(builder).await {
            Ok(resp) => HttpResult::from_response(resp),
            Err(e) => HttpResult::failed(e),
        }
    }
}

fn header_list(headers: &HashMap<String, String>) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn status_info(status: reqwest::StatusCode, headers: &reqwest::header::HeaderMap) -> StatusInfo {
    StatusInfo {
        code: status.as_u16(),
        status: net::status_line(status),
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect(),
    }
}

fn file_error(path: &Path, source: std::io::Error) -> CapabilityError {
    CapabilityError::File {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_shapes() {
        assert_eq!(payload_from_value(json!(null)).unwrap(), Payload::Empty);
        assert_eq!(payload_from_value(json!("hi")).unwrap(), Payload::Text("hi".into()));
        assert_eq!(
            payload_from_value(json!({"a": "1"})).unwrap(),
            Payload::Form(vec![("a".into(), "1".into())])
        );
        assert_eq!(
            payload_from_value(json!([104, 105])).unwrap(),
            Payload::Raw(Bytes::from_static(b"hi"))
        );
    }

    #[test]
    fn unsupported_payload_shapes_are_errors() {
        for value in [json!(42), json!(true), json!({"a": 1}), json!([300]), json!(["x"])] {
            assert!(matches!(
                payload_from_value(value),
                Err(CapabilityError::UnsupportedPayload(_))
            ));
        }
    }

    #[tokio::test]
    async fn unsupported_payload_is_reported_not_sent() {
        let http = HttpCapability::new(HttpClient::new(&Default::default()).unwrap());
        let result = http
            .request_value("POST", "http://127.0.0.1:9/", &HashMap::new(), json!(1.5))
            .await;
        assert!(matches!(result.error, Some(CapabilityError::UnsupportedPayload(_))));
        assert!(result.response.is_none());
    }

    #[tokio::test]
    async fn invalid_url_is_reported() {
        let http = HttpCapability::new(HttpClient::new(&Default::default()).unwrap());
        let result = http.get("::not a url::", &HashMap::new()).await;
        assert!(!result.is_ok());
    }

    #[tokio::test]
    async fn download_from_unreachable_host_is_a_net_error() {
        // Bind then drop to get a local port nothing listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let http = HttpCapability::new(HttpClient::new(&Default::default()).unwrap());
        let result = http
            .download_file(
                &path,
                "GET",
                &format!("http://127.0.0.1:{port}/"),
                &HashMap::new(),
                Payload::Empty,
            )
            .await;

        assert!(matches!(result.error, Some(CapabilityError::Net(_))));
        assert!(result.response.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn upload_of_missing_file_is_a_file_error() {
        let http = HttpCapability::new(HttpClient::new(&Default::default()).unwrap());
        let result = http
            .upload_file(
                "POST",
                "http://127.0.0.1:9/",
                &HashMap::new(),
                &HashMap::new(),
                "/no/such/file",
                "file",
            )
            .await;
        assert!(matches!(result.error, Some(CapabilityError::File { .. })));
    }
}
