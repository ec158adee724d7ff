//! Nova Messaging Library
//!
//! This library provides the Firebase Cloud Messaging (FCM) dispatch layer
//! used to push notifications to Android, iOS and Web clients across the
//! Nova platform.
//!
//! It handles:
//! - Single message delivery and dry-run validation
//! - Multicast fan-out through one batched `multipart/mixed` request
//! - Raw batch sends of up to 100 messages
//! - Topic subscription management
//! - OAuth2 token generation using Google service accounts
//!
//! ```rust,no_run
//! use nova_messaging::{MessagingClient, ServiceAccountKey};
//! use serde_json::json;
//!
//! # async fn run(key: ServiceAccountKey) -> Result<(), nova_messaging::MessagingError> {
//! let client = MessagingClient::from_service_account(key);
//!
//! client
//!     .send_multicast(json!({
//!         "tokens": ["device-a", "device-b"],
//!         "notification": {"title": "New follower", "body": "alice followed you"}
//!     }))
//!     .await?;
//!
//! client.subscribe_to_topic("news", vec!["device-a", "device-b"]).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod batch;
pub mod client;
pub mod config;
pub mod errors;
pub mod message;
pub mod tokens;
pub mod transport;

pub use auth::{
    AccessTokenProvider, ServiceAccountKey, ServiceAccountTokenProvider, StaticTokenProvider,
};
pub use batch::{BatchApiClient, BatchEnvelope, BatchSubRequest};
pub use client::MessagingClient;
pub use config::{MessagingConfig, BATCH_TIMEOUT, MAX_BATCH_SIZE, PART_BOUNDARY};
pub use errors::{AuthError, ErrorKind, MessagingError, TransportError};
pub use message::{
    CloudMessage, Condition, Message, MessageInput, MessageTarget, Notification, TargetKind,
};
pub use tokens::{
    RegistrationToken, RegistrationTokenInput, RegistrationTokens, TokenItem, Topic, TopicInput,
};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
