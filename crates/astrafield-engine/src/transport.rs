use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::multipart::{Form as MultipartForm, Part as MultipartPart};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Fixed prefix in front of every endpoint.
pub const API_BASE: &str = "/api";

const ERROR_DETAIL_MAX_CHARS: usize = 512;

/// Raw response as seen by the adapter, before status/content checks.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Multipart body: at most one file plus ordered text fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartPayload {
    pub file: Option<FilePart>,
    pub fields: Vec<(String, String)>,
}

impl MultipartPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: FilePart) -> Self {
        self.file = Some(file);
        self
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn to_form(&self) -> Result<MultipartForm> {
        let mut form = MultipartForm::new();
        if let Some(file) = self.file.as_ref() {
            let mut part = MultipartPart::bytes(file.bytes.clone()).file_name(file.file_name.clone());
            if let Some(mime) = file.mime_type.as_deref() {
                part = part
                    .mime_str(mime)
                    .with_context(|| format!("invalid mime '{mime}' for {}", file.file_name))?;
            }
            form = form.part(file.field.clone(), part);
        }
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        Ok(form)
    }
}

/// Minimal HTTP surface the adapter needs.
pub trait HttpTransport {
    fn get(&self, url: &str) -> Result<HttpReply>;
    fn post_multipart(&self, url: &str, payload: &MultipartPayload) -> Result<HttpReply>;
}

/// Blocking reqwest transport. Requests have no timeout and cannot be
/// cancelled; a hung server blocks the calling command.
pub struct ReqwestTransport {
    http: HttpClient,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(None::<Duration>)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str) -> Result<HttpReply> {
        let response = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("GET {url} failed"))?;
        read_reply(response)
    }

    fn post_multipart(&self, url: &str, payload: &MultipartPayload) -> Result<HttpReply> {
        let response = self
            .http
            .post(url)
            .multipart(payload.to_form()?)
            .send()
            .with_context(|| format!("POST {url} failed"))?;
        read_reply(response)
    }
}

fn read_reply(response: HttpResponse) -> Result<HttpReply> {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = response
        .bytes()
        .context("response body read failed")?
        .to_vec();
    Ok(HttpReply {
        status,
        content_type,
        body,
    })
}

/// Non-2xx response. Carries the backend's `{"error": ...}` text when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStatusError {
    pub status: u16,
    pub detail: Option<String>,
}

impl HttpStatusError {
    fn from_reply(reply: &HttpReply) -> Self {
        Self {
            status: reply.status,
            detail: error_detail(&reply.body),
        }
    }
}

impl fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail.as_deref() {
            Some(detail) => write!(f, "HTTP {}: {detail}", self.status),
            None => write!(f, "HTTP {}", self.status),
        }
    }
}

impl std::error::Error for HttpStatusError {}

fn error_detail(body: &[u8]) -> Option<String> {
    let payload: Value = serde_json::from_slice(body).ok()?;
    let object = payload.as_object()?;
    let detail = object.get("error").or_else(|| object.get("detail"))?;
    let text = match detail {
        Value::String(text) => text.trim().to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    if text.is_empty() {
        return None;
    }
    Some(truncate_text(&text, ERROR_DETAIL_MAX_CHARS))
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

/// Decoded result of a form submission.
#[derive(Debug, Clone, PartialEq)]
pub enum FormReply {
    Json(Value),
    Binary {
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|value| value.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

/// Talks to `{origin}/api{endpoint}` through an [`HttpTransport`].
pub struct ApiClient<T: HttpTransport> {
    transport: T,
    origin: String,
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(transport: T, origin: &str) -> Self {
        Self {
            transport,
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{API_BASE}{endpoint}", self.origin)
    }

    pub fn get_json<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R> {
        let reply = self.transport.get(&self.endpoint_url(endpoint))?;
        if !reply.is_success() {
            return Err(HttpStatusError::from_reply(&reply).into());
        }
        serde_json::from_slice(&reply.body)
            .with_context(|| format!("{endpoint} returned invalid JSON payload"))
    }

    /// Submits `payload`; JSON replies are decoded, anything else is
    /// returned byte-for-byte.
    pub fn post_form(&self, endpoint: &str, payload: &MultipartPayload) -> Result<FormReply> {
        let reply = self
            .transport
            .post_multipart(&self.endpoint_url(endpoint), payload)?;
        if !reply.is_success() {
            return Err(HttpStatusError::from_reply(&reply).into());
        }
        if is_json_content_type(reply.content_type.as_deref()) {
            let value = serde_json::from_slice(&reply.body)
                .with_context(|| format!("{endpoint} returned invalid JSON payload"))?;
            return Ok(FormReply::Json(value));
        }
        Ok(FormReply::Binary {
            content_type: reply.content_type,
            bytes: reply.body,
        })
    }
}
