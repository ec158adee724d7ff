//! Registration tokens and topics
//!
//! Both are validated value types. Validation is purely syntactic; whether a
//! token is still registered is only known to the backend.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::errors::{MessagingError, Result};

/// Opaque identifier of one client app instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrationToken(String);

impl RegistrationToken {
    pub fn from_value(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref();

        if value.trim().is_empty() {
            return Err(MessagingError::invalid_argument(
                "Registration token must be a non-empty string",
            ));
        }

        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(MessagingError::invalid_argument(format!(
                "Malformed registration token '{}'",
                token_prefix(value)
            )));
        }

        Ok(Self(value.to_string()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    /// First characters of the token, safe for logs
    pub fn prefix(&self) -> String {
        token_prefix(&self.0)
    }
}

impl fmt::Display for RegistrationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RegistrationToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

pub(crate) fn token_prefix(value: &str) -> String {
    value.chars().take(8).collect()
}

/// Named broadcast channel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    /// Accepts `news` as well as `/topics/news`
    pub fn from_value(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref();
        let name = value.strip_prefix("/topics/").unwrap_or(value);

        if name.is_empty() {
            return Err(MessagingError::invalid_argument("Topic name must not be empty"));
        }

        if !name.chars().all(is_topic_char) {
            return Err(MessagingError::invalid_argument(format!(
                "Invalid topic name '{}': only letters, digits and -_.~% are allowed",
                name
            )));
        }

        Ok(Self(name.to_string()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    /// `/topics/<name>`, as expected by the topic management API
    pub fn condition_name(&self) -> String {
        format!("/topics/{}", self.0)
    }
}

fn is_topic_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '%')
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Topic argument: either already validated or a raw name
#[derive(Debug, Clone)]
pub enum TopicInput {
    Topic(Topic),
    Raw(String),
}

impl TopicInput {
    pub fn resolve(self) -> Result<Topic> {
        match self {
            TopicInput::Topic(topic) => Ok(topic),
            TopicInput::Raw(value) => Topic::from_value(value),
        }
    }
}

impl From<Topic> for TopicInput {
    fn from(topic: Topic) -> Self {
        TopicInput::Topic(topic)
    }
}

impl From<&Topic> for TopicInput {
    fn from(topic: &Topic) -> Self {
        TopicInput::Topic(topic.clone())
    }
}

impl From<&str> for TopicInput {
    fn from(value: &str) -> Self {
        TopicInput::Raw(value.to_string())
    }
}

impl From<String> for TopicInput {
    fn from(value: String) -> Self {
        TopicInput::Raw(value)
    }
}

/// One element of a token collection
#[derive(Debug, Clone)]
pub enum TokenItem {
    Token(RegistrationToken),
    Raw(String),
}

impl TokenItem {
    fn into_token(self) -> Result<RegistrationToken> {
        match self {
            TokenItem::Token(token) => Ok(token),
            TokenItem::Raw(value) => RegistrationToken::from_value(value),
        }
    }
}

impl From<RegistrationToken> for TokenItem {
    fn from(token: RegistrationToken) -> Self {
        TokenItem::Token(token)
    }
}

impl From<&str> for TokenItem {
    fn from(value: &str) -> Self {
        TokenItem::Raw(value.to_string())
    }
}

impl From<String> for TokenItem {
    fn from(value: String) -> Self {
        TokenItem::Raw(value)
    }
}

/// Anything that can be normalized into [`RegistrationTokens`]
#[derive(Debug, Clone)]
pub enum RegistrationTokenInput {
    Single(TokenItem),
    Many(Vec<TokenItem>),
    /// Untyped input, e.g. the `tokens` field of a raw message
    Json(Value),
}

impl From<RegistrationToken> for RegistrationTokenInput {
    fn from(token: RegistrationToken) -> Self {
        RegistrationTokenInput::Single(TokenItem::Token(token))
    }
}

impl From<&str> for RegistrationTokenInput {
    fn from(value: &str) -> Self {
        RegistrationTokenInput::Single(TokenItem::from(value))
    }
}

impl From<String> for RegistrationTokenInput {
    fn from(value: String) -> Self {
        RegistrationTokenInput::Single(TokenItem::from(value))
    }
}

impl From<Vec<TokenItem>> for RegistrationTokenInput {
    fn from(items: Vec<TokenItem>) -> Self {
        RegistrationTokenInput::Many(items)
    }
}

impl From<Vec<RegistrationToken>> for RegistrationTokenInput {
    fn from(tokens: Vec<RegistrationToken>) -> Self {
        RegistrationTokenInput::Many(tokens.into_iter().map(TokenItem::from).collect())
    }
}

impl From<Vec<String>> for RegistrationTokenInput {
    fn from(values: Vec<String>) -> Self {
        RegistrationTokenInput::Many(values.into_iter().map(TokenItem::from).collect())
    }
}

impl From<Vec<&str>> for RegistrationTokenInput {
    fn from(values: Vec<&str>) -> Self {
        RegistrationTokenInput::Many(values.into_iter().map(TokenItem::from).collect())
    }
}

impl From<&[&str]> for RegistrationTokenInput {
    fn from(values: &[&str]) -> Self {
        RegistrationTokenInput::Many(values.iter().copied().map(TokenItem::from).collect())
    }
}

impl From<&[String]> for RegistrationTokenInput {
    fn from(values: &[String]) -> Self {
        RegistrationTokenInput::Many(values.iter().cloned().map(TokenItem::from).collect())
    }
}

impl From<Value> for RegistrationTokenInput {
    fn from(value: Value) -> Self {
        RegistrationTokenInput::Json(value)
    }
}

/// Ordered, non-empty list of recipients. Duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RegistrationTokens(Vec<RegistrationToken>);

impl RegistrationTokens {
    pub fn normalize(input: impl Into<RegistrationTokenInput>) -> Result<Self> {
        let items = match input.into() {
            RegistrationTokenInput::Single(item) => vec![item],
            RegistrationTokenInput::Many(items) => items,
            RegistrationTokenInput::Json(value) => json_items(value)?,
        };

        if items.is_empty() {
            return Err(MessagingError::invalid_argument(
                "Empty array of registration tokens",
            ));
        }

        let tokens = items
            .into_iter()
            .map(TokenItem::into_token)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self(tokens))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegistrationToken> {
        self.0.iter()
    }

    pub fn values(&self) -> Vec<&str> {
        self.0.iter().map(RegistrationToken::value).collect()
    }

    pub fn into_vec(self) -> Vec<RegistrationToken> {
        self.0
    }
}

impl IntoIterator for RegistrationTokens {
    type Item = RegistrationToken;
    type IntoIter = std::vec::IntoIter<RegistrationToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RegistrationTokens {
    type Item = &'a RegistrationToken;
    type IntoIter = std::slice::Iter<'a, RegistrationToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn json_items(value: Value) -> Result<Vec<TokenItem>> {
    match value {
        Value::String(value) => Ok(vec![TokenItem::Raw(value)]),
        Value::Array(values) => values
            .into_iter()
            .map(|value| match value {
                Value::String(value) => Ok(TokenItem::Raw(value)),
                other => Err(MessagingError::invalid_argument(format!(
                    "Invalid registration token: expected a string, got {}",
                    json_type_name(&other)
                ))),
            })
            .collect(),
        other => Err(MessagingError::invalid_argument(format!(
            "Invalid registration tokens: unsupported type {}",
            json_type_name(&other)
        ))),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
