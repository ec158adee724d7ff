//! Outbound HTTP seam
//!
//! Everything the client sends goes through [`HttpTransport`]. The production
//! implementation is [`ReqwestTransport`]; tests substitute their own.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use tracing::{debug, error};

use crate::auth::AccessTokenProvider;
use crate::errors::TransportError;

/// Fully described outbound request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// `None` keeps the transport default
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn post(uri: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            uri: uri.into(),
            headers: Vec::new(),
            body: body.into(),
            timeout: None,
        }
    }

    pub fn json(uri: impl Into<String>, body: &serde_json::Value) -> Self {
        Self::post(uri, body.to_string()).header("Content-Type", "application/json")
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Response as received from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Executes one HTTP request
///
/// Implementations must return [`TransportError::Status`] for non-2xx
/// responses so callers can inspect the backend's answer.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait::async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request).await
    }
}

/// [`HttpTransport`] over a shared `reqwest::Client`
///
/// Adds `Authorization: Bearer <token>` from the configured provider.
#[derive(Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    token_provider: Arc<dyn AccessTokenProvider>,
}

impl ReqwestTransport {
    pub fn new(token_provider: Arc<dyn AccessTokenProvider>) -> Self {
        Self::with_client(reqwest::Client::new(), token_provider)
    }

    pub fn with_client(
        http_client: reqwest::Client,
        token_provider: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self {
            http_client,
            token_provider,
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let access_token = self.token_provider.access_token().await?;

        let mut builder = self
            .http_client
            .request(request.method.clone(), &request.uri)
            .bearer_auth(access_token)
            .body(request.body);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        debug!("{} {}", request.method, request.uri);

        let response = builder.send().await.map_err(|e| {
            error!("Messaging request to {} failed: {}", request.uri, e);
            map_reqwest_error(e)
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(map_reqwest_error)?;

        let response = HttpResponse {
            status,
            headers,
            body,
        };

        if response.is_success() {
            Ok(response)
        } else {
            error!(
                "Messaging API error: {} {} returned {}",
                request.method, request.uri, status
            );
            Err(TransportError::Status { status, response })
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}
