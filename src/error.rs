use reqwest::StatusCode;
use serde_json::Value;

use crate::session::SessionStoreError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response (connect, timeout, TLS, ...).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    /// The access token expired and could not be renewed; the session is gone.
    #[error("token refresh failed: {0}")]
    RefreshFailed(#[source] Box<ClientError>),

    /// Refresh failed and the stored tokens could not be removed either.
    #[error("token refresh failed ({refresh}) and the session could not be cleared: {store}")]
    TeardownFailed {
        refresh: Box<ClientError>,
        #[source]
        store: SessionStoreError,
    },

    #[error(transparent)]
    Store(#[from] SessionStoreError),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(Box::new(err))
    }
}

impl ClientError {
    pub fn network(message: impl Into<String>) -> Self {
        ClientError::Network(message.into().into())
    }

    /// Build an `Api` error from a status and the raw response body.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let (code, message) = extract_message(body).unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            let message = if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                text
            };
            (None, message)
        });

        ClientError::Api {
            status,
            code,
            message,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::RefreshFailed(inner) => inner.status(),
            ClientError::TeardownFailed { refresh, .. } => refresh.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Api { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    /// True when the failure ended the session and the user has to sign in again.
    pub fn is_session_ended(&self) -> bool {
        matches!(
            self,
            ClientError::RefreshFailed(_) | ClientError::TeardownFailed { .. }
        )
    }
}

/// Pull a human readable message out of the DRF error bodies the backend
/// emits: `{"detail": "...", "code": "..."}` or field maps like
/// `{"phone": ["already exists"]}`.
fn extract_message(body: &[u8]) -> Option<(Option<String>, String)> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let map = value.as_object()?;

    if let Some(detail) = map.get("detail").and_then(Value::as_str) {
        let code = map.get("code").and_then(Value::as_str).map(str::to_string);
        return Some((code, detail.to_string()));
    }

    let mut parts = Vec::new();
    for (field, errors) in map {
        let text = match errors {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" "),
            other => other.to_string(),
        };
        if field == "non_field_errors" {
            parts.push(text);
        } else {
            parts.push(format!("{field}: {text}"));
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some((Some("VALIDATION_ERROR".to_string()), parts.join("; ")))
    }
}
