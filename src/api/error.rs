//! Error types for the remote client
//!
//! Failures keep enough of the HTTP exchange (status, headers, body) for a
//! caller to render a user-facing message.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The HTTP side of a failed call
#[derive(Debug, Clone, PartialEq)]
pub struct HttpFailure {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpFailure {
    pub fn new(status: u16, headers: HashMap<String, String>, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// First `message` out of the API's `[{"message": .., "errorCode": ..}]` error body
    pub fn message(&self) -> Option<String> {
        let json: serde_json::Value = serde_json::from_str(&self.body).ok()?;
        let first = json.as_array().and_then(|items| items.first()).unwrap_or(&json);
        first
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "HTTP {}: {}", self.status, message),
            None if self.body.is_empty() => write!(f, "HTTP {}", self.status),
            None => write!(f, "HTTP {}: {}", self.status, self.body),
        }
    }
}

/// Network-level failure below HTTP
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else {
            TransportError::Other(error.to_string())
        }
    }
}

/// Failure to obtain or refresh credentials
///
/// `Clone` so that a single in-flight refresh can hand its outcome to every waiter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    #[error("no refresh token available")]
    NoRefreshToken,
    #[error("embedded authentication requires a host-supplied session id")]
    NoSessionId,
    #[error("no access token could be obtained")]
    NoToken,
    #[error("cannot derive an instance URL from host '{0}'")]
    UnresolvableInstance(String),
    #[error("token endpoint rejected the request: {0}")]
    Rejected(HttpFailure),
    #[error("token request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("invalid token response: {0}")]
    InvalidResponse(String),
    #[error("session storage failed: {0}")]
    Storage(String),
}

/// Query descriptor violations, caught before anything goes over the wire
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    #[error("malformed query: {0}")]
    Malformed(String),
}

/// Failure of a call through the request pipeline
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// No access token is present; run the auth flow first
    #[error("not authenticated")]
    Unauthenticated,
    /// 401 that could not be recovered by a refresh
    #[error("authorization expired: {0}")]
    AuthorizationExpired(HttpFailure),
    /// Any other non-2xx answer
    #[error("remote rejected the request: {0}")]
    RemoteRejected(HttpFailure),
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The remote API has no atomic multi-record endpoint
    #[error("{action} accepts one record at a time, received {count}")]
    TooManyRecords { action: &'static str, count: usize },
    /// 2xx whose body is not the JSON we expected
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl RequestError {
    /// HTTP status of the failure, when there was one
    pub fn status(&self) -> Option<u16> {
        self.failure().map(|f| f.status)
    }

    /// HTTP context of the failure, when there was one
    pub fn failure(&self) -> Option<&HttpFailure> {
        match self {
            RequestError::AuthorizationExpired(failure) | RequestError::RemoteRejected(failure) => {
                Some(failure)
            }
            _ => None,
        }
    }

    /// Whether re-running the auth flow would help
    pub fn needs_authentication(&self) -> bool {
        matches!(self, RequestError::Unauthenticated | RequestError::AuthorizationExpired(_))
    }
}

impl From<QueryError> for RequestError {
    fn from(error: QueryError) -> Self {
        match error {
            QueryError::Malformed(reason) => RequestError::Malformed(reason),
        }
    }
}
