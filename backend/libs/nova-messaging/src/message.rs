//! Message variants
//!
//! [`Message`] is a closed union over the supported message kinds. Today the
//! only kind is [`CloudMessage`]. Messages are immutable once built; changing
//! the target produces a new value.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::errors::{MessagingError, Result};
use crate::tokens::{json_type_name, RegistrationToken, Topic};

/// Topic condition expression, e.g. `'a' in topics && 'b' in topics`
///
/// Only checked for emptiness and padding; the backend evaluates the expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition(String);

impl Condition {
    pub fn from_value(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref();
        if value.trim().is_empty() {
            return Err(MessagingError::invalid_argument("Condition must not be empty"));
        }
        if value.trim() != value {
            return Err(MessagingError::invalid_argument(
                "Condition must not have leading or trailing whitespace",
            ));
        }
        Ok(Self(value.to_string()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Token,
    Topic,
    Condition,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Token => "token",
            TargetKind::Topic => "topic",
            TargetKind::Condition => "condition",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetKind {
    type Err = MessagingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "token" => Ok(TargetKind::Token),
            "topic" => Ok(TargetKind::Topic),
            "condition" => Ok(TargetKind::Condition),
            other => Err(MessagingError::invalid_argument(format!(
                "Unknown message target '{}'",
                other
            ))),
        }
    }
}

/// Addressing of a message; exactly one kind at a time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageTarget {
    Token(RegistrationToken),
    Topic(Topic),
    Condition(Condition),
}

impl MessageTarget {
    pub fn new(kind: TargetKind, value: impl AsRef<str>) -> Result<Self> {
        Ok(match kind {
            TargetKind::Token => MessageTarget::Token(RegistrationToken::from_value(value)?),
            TargetKind::Topic => MessageTarget::Topic(Topic::from_value(value)?),
            TargetKind::Condition => MessageTarget::Condition(Condition::from_value(value)?),
        })
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            MessageTarget::Token(_) => TargetKind::Token,
            MessageTarget::Topic(_) => TargetKind::Topic,
            MessageTarget::Condition(_) => TargetKind::Condition,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            MessageTarget::Token(token) => token.value(),
            MessageTarget::Topic(topic) => topic.value(),
            MessageTarget::Condition(condition) => condition.value(),
        }
    }
}

/// Notification Payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Notification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
            image: None,
        }
    }
}

/// FCM HTTP v1 message
///
/// Serializes to the backend's message JSON. The multicast `tokens` list is
/// kept for [`MessagingClient::send_multicast`](crate::MessagingClient::send_multicast)
/// and never serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CloudMessage {
    #[serde(flatten)]
    target: Option<MessageTarget>,
    #[serde(skip)]
    tokens: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification: Option<Notification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    android: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    apns: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    webpush: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fcm_options: Option<Value>,
}

/// Wire shape accepted by [`CloudMessage::from_json`]
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCloudMessage {
    token: Option<String>,
    topic: Option<String>,
    condition: Option<String>,
    tokens: Option<Value>,
    name: Option<String>,
    notification: Option<Notification>,
    data: Option<BTreeMap<String, String>>,
    android: Option<Value>,
    apns: Option<Value>,
    webpush: Option<Value>,
    fcm_options: Option<Value>,
}

impl CloudMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(target: MessageTarget) -> Self {
        Self::new().with_changed_target_to(target)
    }

    /// Build a message from its JSON representation
    ///
    /// A message without a target is accepted as a multicast template; the
    /// client refuses to send it directly.
    pub fn from_json(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(MessagingError::invalid_argument(format!(
                "Unsupported message type: expected an object, got {}",
                json_type_name(&value)
            )));
        }

        let raw: RawCloudMessage = serde_json::from_value(value)
            .map_err(|e| MessagingError::MessageConstruction(e.to_string()))?;

        let targets = [
            raw.token.map(|v| (TargetKind::Token, v)),
            raw.topic.map(|v| (TargetKind::Topic, v)),
            raw.condition.map(|v| (TargetKind::Condition, v)),
        ];
        let mut targets = targets.into_iter().flatten();

        let target = match (targets.next(), targets.next()) {
            (None, _) => None,
            (Some((kind, value)), None) => Some(
                MessageTarget::new(kind, value)
                    .map_err(|e| MessagingError::MessageConstruction(e.to_string()))?,
            ),
            (Some((first, _)), Some((second, _))) => {
                return Err(MessagingError::MessageConstruction(format!(
                    "A message can only have one of token, topic or condition (got {} and {})",
                    first, second
                )));
            }
        };

        Ok(Self {
            target,
            tokens: raw.tokens,
            name: raw.name,
            notification: raw.notification,
            data: raw.data,
            android: raw.android,
            apns: raw.apns,
            webpush: raw.webpush,
            fcm_options: raw.fcm_options,
        })
    }

    /// Copy of this message addressed to `value`, validated for `kind`
    ///
    /// Only the named target is set on the copy; the receiver is left as is.
    pub fn with_changed_target(&self, kind: TargetKind, value: impl AsRef<str>) -> Result<Self> {
        Ok(self.clone().with_changed_target_to(MessageTarget::new(kind, value)?))
    }

    fn with_changed_target_to(mut self, target: MessageTarget) -> Self {
        self.target = Some(target);
        self.tokens = None;
        self
    }

    pub fn with_tokens(mut self, tokens: Value) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_notification(mut self, notification: Notification) -> Self {
        self.notification = Some(notification);
        self
    }

    pub fn with_data<K, V, I>(mut self, data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.data = Some(data.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn with_android_config(mut self, config: Value) -> Self {
        self.android = Some(config);
        self
    }

    pub fn with_apns_config(mut self, config: Value) -> Self {
        self.apns = Some(config);
        self
    }

    pub fn with_webpush_config(mut self, config: Value) -> Self {
        self.webpush = Some(config);
        self
    }

    pub fn with_fcm_options(mut self, options: Value) -> Self {
        self.fcm_options = Some(options);
        self
    }

    pub fn target(&self) -> Option<&MessageTarget> {
        self.target.as_ref()
    }

    pub fn tokens(&self) -> Option<&Value> {
        self.tokens.as_ref()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn data(&self) -> Option<&BTreeMap<String, String>> {
        self.data.as_ref()
    }
}

/// Any message the client can deliver
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum Message {
    Cloud(CloudMessage),
}

impl Message {
    /// Convert a raw JSON mapping into a message
    pub fn from_json(value: Value) -> Result<Self> {
        CloudMessage::from_json(value).map(Message::Cloud)
    }

    pub fn with_changed_target(&self, kind: TargetKind, value: impl AsRef<str>) -> Result<Self> {
        match self {
            Message::Cloud(message) => message.with_changed_target(kind, value).map(Message::Cloud),
        }
    }

    pub fn target(&self) -> Option<&MessageTarget> {
        match self {
            Message::Cloud(message) => message.target(),
        }
    }

    pub fn tokens(&self) -> Option<&Value> {
        match self {
            Message::Cloud(message) => message.tokens(),
        }
    }
}

impl From<CloudMessage> for Message {
    fn from(message: CloudMessage) -> Self {
        Message::Cloud(message)
    }
}

/// Message argument: a typed message or a raw JSON mapping
#[derive(Debug, Clone)]
pub enum MessageInput {
    Message(Message),
    Raw(Value),
}

impl MessageInput {
    pub fn into_message(self) -> Result<Message> {
        match self {
            MessageInput::Message(message) => Ok(message),
            MessageInput::Raw(value) => Message::from_json(value),
        }
    }
}

impl From<Message> for MessageInput {
    fn from(message: Message) -> Self {
        MessageInput::Message(message)
    }
}

impl From<CloudMessage> for MessageInput {
    fn from(message: CloudMessage) -> Self {
        MessageInput::Message(Message::Cloud(message))
    }
}

impl From<Value> for MessageInput {
    fn from(value: Value) -> Self {
        MessageInput::Raw(value)
    }
}
