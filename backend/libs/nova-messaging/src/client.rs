use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::auth::{ServiceAccountKey, ServiceAccountTokenProvider};
use crate::batch::BatchApiClient;
use crate::config::{MessagingConfig, MAX_BATCH_SIZE, MAX_TOPIC_MANAGEMENT_TOKENS};
use crate::errors::{is_not_found_status, MessagingError, Result, TransportError};
use crate::message::{Message, MessageInput, TargetKind};
use crate::tokens::{token_prefix, RegistrationTokenInput, RegistrationTokens, TopicInput};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Firebase Cloud Messaging Client
///
/// Routes each call to a single send, a batched send or a topic management
/// request. Every operation issues at most one HTTP request, and all input
/// checks run before it.
pub struct MessagingClient<T = ReqwestTransport> {
    config: MessagingConfig,
    transport: Arc<T>,
    batch_api: BatchApiClient<Arc<T>>,
}

impl MessagingClient<ReqwestTransport> {
    /// Create a client authenticated with a service account key
    pub fn from_service_account(credentials: ServiceAccountKey) -> Self {
        let config = MessagingConfig::new(credentials.project_id.clone());
        let provider = Arc::new(ServiceAccountTokenProvider::new(credentials));

        Self::new(config, ReqwestTransport::new(provider))
    }
}

impl<T: HttpTransport> MessagingClient<T> {
    pub fn new(config: MessagingConfig, transport: T) -> Self {
        let transport = Arc::new(transport);
        let batch_api = BatchApiClient::new(Arc::clone(&transport), config.clone());

        Self {
            config,
            transport,
            batch_api,
        }
    }

    pub fn config(&self) -> &MessagingConfig {
        &self.config
    }

    /// Send one message
    pub async fn send(&self, message: impl Into<MessageInput>) -> Result<Value> {
        let message = message.into().into_message()?;
        require_target(&message)?;

        let request = self.message_request(&message, false);
        let response = self.transport.execute(request).await?;

        info!("Message sent to {}", describe_target(&message));
        decode_json(&response)
    }

    /// Send a copy of the message to every entry of its `tokens` field
    pub async fn send_multicast(&self, message: impl Into<MessageInput>) -> Result<Value> {
        let message = message.into().into_message()?;

        let tokens = match message.tokens() {
            Some(Value::Array(tokens)) if !tokens.is_empty() => tokens.clone(),
            _ => {
                return Err(MessagingError::invalid_argument(
                    "Tokens must be a non-empty array",
                ))
            }
        };

        if tokens.len() > MAX_BATCH_SIZE {
            return Err(MessagingError::invalid_argument(format!(
                "Tokens list must not contain more than {} items",
                MAX_BATCH_SIZE
            )));
        }

        let tokens = RegistrationTokens::normalize(Value::Array(tokens))?;

        let messages = tokens
            .iter()
            .map(|token| message.with_changed_target(TargetKind::Token, token.value()))
            .collect::<Result<Vec<_>>>()?;

        debug!("Multicast fan-out to {} tokens", messages.len());
        self.send_all(messages).await
    }

    /// Send up to 100 messages in one batch request
    ///
    /// The response body is returned as is; per-message results are not
    /// extracted.
    pub async fn send_all(&self, messages: Vec<Message>) -> Result<Value> {
        if messages.is_empty() {
            return Err(MessagingError::invalid_argument(
                "Messages must be a non-empty array",
            ));
        }

        if messages.len() > MAX_BATCH_SIZE {
            return Err(MessagingError::invalid_argument(format!(
                "Messages list must not contain more than {} items",
                MAX_BATCH_SIZE
            )));
        }

        messages.iter().try_for_each(require_target)?;

        let response = self.batch_api.send_messages(&messages).await.map_err(|e| {
            error!("Batch send of {} messages failed: {}", messages.len(), e);
            e
        })?;

        info!("Batch of {} messages accepted", messages.len());
        Ok(decode_batch_body(&response))
    }

    /// Dry-run a message against the backend without delivering it
    pub async fn validate(&self, message: impl Into<MessageInput>) -> Result<Value> {
        let message = message.into().into_message()?;
        require_target(&message)?;

        let request = self.message_request(&message, true);
        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(TransportError::Status { status, response }) if is_not_found_status(status) => {
                warn!(
                    "Message to {} rejected during validation ({})",
                    describe_target(&message),
                    status
                );
                return Err(MessagingError::InvalidMessage {
                    message: backend_error_message(&response),
                    response,
                });
            }
            Err(e) => return Err(e.into()),
        };

        decode_json(&response)
    }

    pub async fn subscribe_to_topic(
        &self,
        topic: impl Into<TopicInput>,
        tokens: impl Into<RegistrationTokenInput>,
    ) -> Result<Value> {
        self.manage_topic("batchAdd", topic.into(), tokens.into()).await
    }

    pub async fn unsubscribe_from_topic(
        &self,
        topic: impl Into<TopicInput>,
        tokens: impl Into<RegistrationTokenInput>,
    ) -> Result<Value> {
        self.manage_topic("batchRemove", topic.into(), tokens.into())
            .await
    }

    async fn manage_topic(
        &self,
        operation: &str,
        topic: TopicInput,
        tokens: RegistrationTokenInput,
    ) -> Result<Value> {
        let topic = topic.resolve()?;
        let tokens = RegistrationTokens::normalize(tokens)?;

        if tokens.len() > MAX_TOPIC_MANAGEMENT_TOKENS {
            return Err(MessagingError::invalid_argument(format!(
                "Tokens list must not contain more than {} items",
                MAX_TOPIC_MANAGEMENT_TOKENS
            )));
        }

        let body = json!({
            "to": topic.condition_name(),
            "registration_tokens": tokens,
        });

        let request = HttpRequest::json(self.config.topic_management_endpoint(operation), &body)
            .header("access_token_auth", "true")
            .timeout(self.config.request_timeout);

        let response = self.transport.execute(request).await?;

        info!(
            "Topic {} for {}: {} tokens",
            operation,
            topic,
            tokens.len()
        );
        decode_json(&response)
    }

    fn message_request(&self, message: &Message, validate_only: bool) -> HttpRequest {
        let body = if validate_only {
            json!({ "message": message, "validate_only": true })
        } else {
            json!({ "message": message })
        };

        HttpRequest::json(self.config.send_endpoint(), &body).timeout(self.config.request_timeout)
    }
}

/// A message without a target can only serve as a multicast template
fn require_target(message: &Message) -> Result<()> {
    if message.target().is_some() {
        return Ok(());
    }

    let hint = if message.tokens().is_some() {
        "; use send_multicast for a message with a tokens list"
    } else {
        ""
    };
    Err(MessagingError::invalid_argument(format!(
        "Message must have exactly one of token, topic or condition{}",
        hint
    )))
}

fn describe_target(message: &Message) -> String {
    match message.target() {
        Some(target) if target.kind() == TargetKind::Token => {
            format!("token {}", token_prefix(target.value()))
        }
        Some(target) => format!("{} {}", target.kind(), target.value()),
        None => "no target".to_string(),
    }
}

/// Error text from a Google API error body, or the raw body
fn backend_error_message(response: &HttpResponse) -> String {
    serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| response.body.clone())
}

fn decode_json(response: &HttpResponse) -> Result<Value> {
    if response.body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    serde_json::from_str(&response.body).map_err(|e| MessagingError::ResponseDecode(e.to_string()))
}

/// JSON when the body is JSON; the backend normally answers multipart, which
/// is handed back as a string
fn decode_batch_body(response: &HttpResponse) -> Value {
    decode_json(response).unwrap_or_else(|_| Value::String(response.body.clone()))
}
