//! Batch send encoding
//!
//! Several `messages:send` calls are bundled into one `multipart/mixed`
//! request. Every part carries a complete serialized HTTP/1.1 request:
//!
//! ```text
//! --__END_OF_PART__
//! Content-Length: <length of the sub-request>
//! Content-Type: application/http
//! content-id: 1
//! content-transfer-encoding: binary
//!
//! POST <messaging-uri>/messages:send HTTP/1.1
//! Content-Length: <length of the JSON body>
//! Content-Type: application/json; charset=UTF-8
//!
//! {"token":"..."}
//! --__END_OF_PART__--
//! ```
//!
//! The `content-id` is the only link between a message and its fragment of
//! the response, so parts are numbered from 1 in input order.

use tracing::debug;

use crate::config::{MessagingConfig, BATCH_TIMEOUT, MAX_BATCH_SIZE, PART_BOUNDARY};
use crate::errors::{MessagingError, Result};
use crate::message::Message;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// One serialized request inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSubRequest {
    pub method: &'static str,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl BatchSubRequest {
    pub fn send_message(uri: impl Into<String>, message: &Message) -> Result<Self> {
        let body = serde_json::to_string(message)
            .map_err(|e| MessagingError::MessageConstruction(e.to_string()))?;

        Ok(Self {
            method: "POST",
            uri: uri.into(),
            headers: Vec::new(),
            body,
        })
    }

    /// Request line, headers, blank line, body
    pub fn serialize(&self) -> String {
        let mut out = format!("{} {} HTTP/1.1\r\n", self.method, self.uri);
        out.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        out.push_str("Content-Type: application/json; charset=UTF-8\r\n");
        for (name, value) in &self.headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str("\r\n");
        out.push_str(&self.body);
        out
    }
}

/// Complete multipart body of a batch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEnvelope {
    boundary: &'static str,
    parts: Vec<BatchSubRequest>,
}

impl BatchEnvelope {
    pub fn new(parts: Vec<BatchSubRequest>) -> Result<Self> {
        if parts.is_empty() {
            return Err(MessagingError::invalid_argument(
                "Messages must be a non-empty array",
            ));
        }
        if parts.len() > MAX_BATCH_SIZE {
            return Err(MessagingError::invalid_argument(format!(
                "Messages list must not contain more than {} items",
                MAX_BATCH_SIZE
            )));
        }

        Ok(Self {
            boundary: PART_BOUNDARY,
            parts,
        })
    }

    /// One `messages:send` sub-request per message, in order
    pub fn for_messages(messaging_uri: &str, messages: &[Message]) -> Result<Self> {
        let uri = format!("{}/messages:send", messaging_uri.trim_end_matches('/'));
        let parts = messages
            .iter()
            .map(|message| BatchSubRequest::send_message(uri.clone(), message))
            .collect::<Result<Vec<_>>>()?;

        Self::new(parts)
    }

    pub fn parts(&self) -> &[BatchSubRequest] {
        &self.parts
    }

    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }

    pub fn encode(&self) -> String {
        let mut body = String::new();

        for (i, part) in self.parts.iter().enumerate() {
            let serialized = part.serialize();

            body.push_str(&format!("--{}\r\n", self.boundary));
            body.push_str(&format!("Content-Length: {}\r\n", serialized.len()));
            body.push_str("Content-Type: application/http\r\n");
            body.push_str(&format!("content-id: {}\r\n", i + 1));
            body.push_str("content-transfer-encoding: binary\r\n");
            body.push_str("\r\n");
            body.push_str(&serialized);
            body.push_str("\r\n");
        }

        body.push_str(&format!("--{}--\r\n", self.boundary));
        body
    }
}

/// Sends encoded batches to the batch endpoint
pub struct BatchApiClient<T> {
    transport: T,
    config: MessagingConfig,
}

impl<T: HttpTransport> BatchApiClient<T> {
    pub fn new(transport: T, config: MessagingConfig) -> Self {
        Self { transport, config }
    }

    pub fn build_request(&self, messages: &[Message]) -> Result<HttpRequest> {
        let envelope = BatchEnvelope::for_messages(&self.config.messaging_uri, messages)?;

        Ok(HttpRequest::post(self.config.batch_endpoint(), envelope.encode())
            .header("Content-Type", envelope.content_type())
            .timeout(Some(BATCH_TIMEOUT)))
    }

    /// Issue one batch request and return the response unparsed
    pub async fn send_messages(&self, messages: &[Message]) -> Result<HttpResponse> {
        let request = self.build_request(messages)?;

        debug!(
            "Sending batch of {} messages to {}",
            messages.len(),
            request.uri
        );

        Ok(self.transport.execute(request).await?)
    }
}
