//! Error types and the normalizer that turns any failure into a single message for the user.

use serde::Deserialize;
use thiserror::Error;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The message shown when nothing more specific can be extracted from a failure.
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred";

/// A failure reported by, or while talking to, the expense backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered 401. The stored token has already been cleared.
    #[error("authentication required (401)")]
    Unauthorized { body: Option<ErrorBody> },

    /// The backend answered with a non-success status.
    #[error("the API responded with status {status}")]
    Status {
        status: u16,
        body: Option<ErrorBody>,
    },

    /// The request never produced a response: timeout, refused connection, DNS, TLS.
    #[error("unable to reach the API: {0}")]
    Transport(String),

    /// A success response whose body could not be decoded.
    #[error("unable to decode the API response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Builds the error for a failed response from its status and raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let body = serde_json::from_str::<ErrorBody>(body).ok();
        if status == 401 {
            ApiError::Unauthorized { body }
        } else {
            ApiError::Status { status, body }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(_) | ApiError::Decode(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    fn body(&self) -> Option<&ErrorBody> {
        match self {
            ApiError::Unauthorized { body } | ApiError::Status { body, .. } => body.as_ref(),
            ApiError::Transport(_) | ApiError::Decode(_) => None,
        }
    }

    /// The normalized message: the body's `message`, else the first per-field message, else the
    /// fallback.
    pub fn user_message(&self) -> String {
        self.body()
            .and_then(ErrorBody::message)
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
    }
}

/// The error body the backend sends, e.g.
///
/// ```json
/// {"message": "The given data was invalid.", "errors": {"name": ["The name has already been taken."]}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    /// Field name to message(s), in the order the backend listed them.
    #[serde(default)]
    pub errors: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ErrorBody {
    fn message(&self) -> Option<String> {
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return Some(message.to_string());
        }
        let (_, first) = self.errors.as_ref()?.iter().next()?;
        match first {
            serde_json::Value::Array(messages) => {
                messages.first().and_then(|m| m.as_str()).map(String::from)
            }
            serde_json::Value::String(message) => Some(message.clone()),
            _ => None,
        }
    }
}

/// Reduces any failure to one human-readable message. `ApiError`s anywhere in the chain contribute
/// their backend message; everything else becomes the fallback.
pub fn normalize(error: &anyhow::Error) -> String {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ApiError>())
        .map(ApiError::user_message)
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
}
