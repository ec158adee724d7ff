use thiserror::Error;

use crate::transport::HttpResponse;

/// Coarse classification callers can match on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied shape or size violation, raised before any I/O
    InvalidArgument,
    /// Network, timeout or non-2xx failure
    Transport,
    /// The backend rejected the message during validation
    InvalidMessage,
}

/// Messaging Error Types
#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to build message: {0}")]
    MessageConstruction(String),

    #[error("Messaging request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid message: {message}")]
    InvalidMessage {
        message: String,
        response: HttpResponse,
    },

    #[error("Failed to parse messaging response: {0}")]
    ResponseDecode(String),
}

impl MessagingError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        MessagingError::InvalidArgument(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MessagingError::InvalidArgument(_) | MessagingError::MessageConstruction(_) => {
                ErrorKind::InvalidArgument
            }
            MessagingError::Transport(_) | MessagingError::ResponseDecode(_) => {
                ErrorKind::Transport
            }
            MessagingError::InvalidMessage { .. } => ErrorKind::InvalidMessage,
        }
    }

    /// The HTTP response attached to the failure, if the backend answered
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            MessagingError::InvalidMessage { response, .. } => Some(response),
            MessagingError::Transport(TransportError::Status { response, .. }) => Some(response),
            _ => None,
        }
    }
}

impl From<MessagingError> for String {
    fn from(err: MessagingError) -> Self {
        err.to_string()
    }
}

/// Failures reported by an [`HttpTransport`](crate::transport::HttpTransport)
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP status {status}: {}", .response.body)]
    Status { status: u16, response: HttpResponse },

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("authorization failed: {0}")]
    Auth(#[from] AuthError),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 404, or a 400 rejection of the message before delivery
pub(crate) fn is_not_found_status(status: u16) -> bool {
    matches!(status, 400 | 404)
}

/// OAuth2 access token errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Failed to parse private key: {0}")]
    KeyParseError(String),

    #[error("Failed to encode JWT: {0}")]
    JwtEncodeError(String),

    #[error("Failed to get access token: {0}")]
    TokenError(String),

    #[error("Token request failed with status: {0}")]
    TokenRequestFailed(String),

    #[error("Failed to parse token response: {0}")]
    TokenParseError(String),
}

pub type Result<T, E = MessagingError> = std::result::Result<T, E>;
