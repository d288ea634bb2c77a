//! Provider HTTP transport.
//!
//! Adapters describe requests declaratively; the transport executes
//! them. Transport-level failures (DNS, timeout, TLS) surface as
//! `EngineError::Transport`. HTTP status codes are data — the adapter
//! decides whether a 401 means "bad credentials" or a bug.

use crate::error::{EngineError, EngineResult};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<(String, String)>,
    pub bearer: Option<String>,
    pub form: Vec<(String, String)>,
    pub json: Option<serde_json::Value>,
}

impl ProviderRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            basic_auth: None,
            bearer: None,
            form: Vec::new(),
            json: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: impl ToString) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub fn basic_auth(mut self, user: &str, password: &str) -> Self {
        self.basic_auth = Some((user.to_string(), password.to_string()));
        self
    }

    pub fn form(mut self, key: &str, value: impl ToString) -> Self {
        self.form.push((key.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ProviderResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Credential rejection rather than transport failure.
    pub fn is_auth_failure(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

/// Executes provider requests. Tests substitute this with canned
/// responses; production uses [`HttpTransport`].
pub trait ProviderTransport: Send {
    fn send(&self, request: ProviderRequest) -> EngineResult<ProviderResponse>;
}

/// Blocking HTTP transport over reqwest.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> EngineResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Share one client across transports; reqwest clients clone cheaply.
    pub fn with_client(client: reqwest::blocking::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ProviderTransport for HttpTransport {
    fn send(&self, request: ProviderRequest) -> EngineResult<ProviderResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some((user, password)) = &request.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }
        if let Some(json) = &request.json {
            builder = builder.json(json);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        // Providers occasionally return empty or non-JSON bodies on errors.
        let body = response
            .json::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null);

        log::debug!("provider call {} -> {status}", url);
        Ok(ProviderResponse { status, body })
    }
}
