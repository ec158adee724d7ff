use std::time::Duration;

use serde::Deserialize;

use crate::errors::MessagingError;

/// Maximum number of messages (or multicast tokens) in one batch request
pub const MAX_BATCH_SIZE: usize = 100;

/// Maximum number of registration tokens per topic management call
pub const MAX_TOPIC_MANAGEMENT_TOKENS: usize = 1000;

/// Boundary marker separating the parts of a batch request body
pub const PART_BOUNDARY: &str = "__END_OF_PART__";

/// Timeout applied to batch requests only
pub const BATCH_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_BASE_URI: &str = "https://fcm.googleapis.com";
pub const DEFAULT_TOPIC_MANAGEMENT_URI: &str = "https://iid.googleapis.com";

/// Messaging endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingConfig {
    pub project_id: String,
    /// Default endpoint; the batch endpoint lives at `<base_uri>/batch`
    pub base_uri: String,
    /// Prefix for `messages:send`, used by direct sends and batch sub-requests
    pub messaging_uri: String,
    pub topic_management_uri: String,
    /// Timeout for direct calls; `None` keeps the transport default
    pub request_timeout: Option<Duration>,
}

/// Raw environment variables, prefixed with `FCM_`
#[derive(Debug, Deserialize)]
struct EnvConfig {
    project_id: String,
    base_uri: Option<String>,
    messaging_uri: Option<String>,
    topic_management_uri: Option<String>,
    request_timeout_secs: Option<u64>,
}

impl MessagingConfig {
    /// Create configuration with the public Google endpoints for `project_id`
    pub fn new(project_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        let messaging_uri = format!("{}/v1/projects/{}", DEFAULT_BASE_URI, project_id);

        Self {
            project_id,
            base_uri: DEFAULT_BASE_URI.to_string(),
            messaging_uri,
            topic_management_uri: DEFAULT_TOPIC_MANAGEMENT_URI.to_string(),
            request_timeout: None,
        }
    }

    /// Load configuration from `FCM_*` environment variables
    ///
    /// `FCM_PROJECT_ID` is required. When only `FCM_BASE_URI` is set the
    /// messaging URI is derived from it.
    pub fn from_env() -> Result<Self, MessagingError> {
        let env = envy::prefixed("FCM_")
            .from_env::<EnvConfig>()
            .map_err(|e| {
                MessagingError::InvalidArgument(format!("invalid FCM configuration: {e}"))
            })?;

        Ok(Self::from_env_config(env))
    }

    fn from_env_config(env: EnvConfig) -> Self {
        let mut config = Self::new(env.project_id);

        if let Some(base_uri) = env.base_uri {
            config = config.with_base_uri(base_uri);
        }
        if let Some(messaging_uri) = env.messaging_uri {
            config = config.with_messaging_uri(messaging_uri);
        }
        if let Some(uri) = env.topic_management_uri {
            config = config.with_topic_management_uri(uri);
        }
        if let Some(secs) = env.request_timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        config
    }

    /// Override the base URI and re-derive the messaging URI from it
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = trim_trailing_slash(base_uri.into());
        self.messaging_uri = format!("{}/v1/projects/{}", self.base_uri, self.project_id);
        self
    }

    pub fn with_messaging_uri(mut self, messaging_uri: impl Into<String>) -> Self {
        self.messaging_uri = trim_trailing_slash(messaging_uri.into());
        self
    }

    pub fn with_topic_management_uri(mut self, uri: impl Into<String>) -> Self {
        self.topic_management_uri = trim_trailing_slash(uri.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn send_endpoint(&self) -> String {
        join_uri(&self.messaging_uri, "messages:send")
    }

    pub fn batch_endpoint(&self) -> String {
        join_uri(&self.base_uri, "batch")
    }

    pub fn topic_management_endpoint(&self, operation: &str) -> String {
        join_uri(&self.topic_management_uri, &format!("iid/v1:{}", operation))
    }
}

fn trim_trailing_slash(uri: String) -> String {
    uri.trim_end_matches('/').to_string()
}

fn join_uri(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
