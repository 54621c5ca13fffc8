use schooldesk_core::error::CoreError;
use serde::Deserialize;

use crate::in_flight::TransitionKey;

/// Errors surfaced by the school API client.
///
/// Lifecycle rejections (local or server-side) arrive as [`CoreError`] so the
/// UI can treat "already handled" and field errors the same way whether they
/// were caught before or after the request.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The HTTP request itself failed (network, DNS, TLS, timeout, decoding).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API returned a non-2xx status that maps to no domain error.
    #[error("School API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The same transition is already waiting for a response.
    #[error("Transition already in flight: {0}")]
    InFlight(TransitionKey),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias for client return values.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Whether the caller may offer a retry. Only transport failures and
    /// server-side (5xx) errors qualify; lifecycle and validation failures
    /// will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Core(_) | Self::InFlight(_) | Self::Config(_) => false,
        }
    }
}

/// JSON error body returned by the school API.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    current_status: Option<String>,
}

/// Map a non-2xx response onto a [`ClientError`].
///
/// `context` identifies the transition being attempted, if any; it supplies
/// the entity and action for lifecycle errors.
pub(crate) fn classify_error_response(
    status: u16,
    body: String,
    context: Option<&TransitionKey>,
) -> ClientError {
    let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
    let code = parsed.code.as_deref().unwrap_or_default();

    if status == 409 || code == "INVALID_TRANSITION" {
        if let Some(key) = context {
            return ClientError::Core(CoreError::InvalidTransition {
                entity: key.entity,
                from: parsed.current_status.unwrap_or_else(|| "unknown".to_string()),
                action: key.action,
            });
        }
    }

    if status == 400 || status == 422 || code == "VALIDATION_ERROR" {
        let message = parsed.error.unwrap_or_else(|| body.clone());
        return ClientError::Core(CoreError::Validation(message));
    }

    if status == 404 {
        if let Some(key) = context {
            return ClientError::Core(CoreError::NotFound {
                entity: key.entity,
                id: key.id,
            });
        }
    }

    ClientError::Api { status, body }
}
