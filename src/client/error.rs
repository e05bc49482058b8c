use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Validation messages keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred";
pub const DECODE_ERROR_MESSAGE: &str = "Unexpected response from the server.";

/// The single error shape every API call resolves to.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub errors: Option<FieldErrors>,
    /// HTTP status when the backend answered; `None` for transport failures.
    pub status: Option<u16>,
}

impl ApiError {
    /// No response was received (connect failure, timeout, reset).
    #[must_use]
    pub fn network() -> Self {
        Self {
            message: NETWORK_ERROR_MESSAGE.to_string(),
            errors: None,
            status: None,
        }
    }

    /// The backend answered with a non-2xx status.
    ///
    /// `message` and `errors` are read independently; a malformed one does
    /// not discard the other.
    #[must_use]
    pub fn rejected(status: u16, body: &[u8]) -> Self {
        let parsed = serde_json::from_slice::<Value>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(Value::as_str)
            .map(ToString::to_string);
        let errors = parsed
            .as_ref()
            .and_then(|body| body.get("errors"))
            .and_then(|errors| FieldErrors::deserialize(errors).ok());

        Self {
            message: message
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            errors,
            status: Some(status),
        }
    }

    /// A 2xx body that does not match the expected type.
    #[must_use]
    pub fn decode(status: Option<u16>) -> Self {
        Self {
            message: DECODE_ERROR_MESSAGE.to_string(),
            errors: None,
            status,
        }
    }

    /// Client-side validation failure that never reached the network.
    #[must_use]
    pub fn invalid(errors: FieldErrors) -> Self {
        Self {
            message: "The given data was invalid.".to_string(),
            errors: Some(errors),
            status: None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    /// First message for `field`, if the error carries one.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&str> {
        self.errors
            .as_ref()
            .and_then(|errors| errors.get(field))
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }
}

/// Decode an unwrapped payload, mapping mismatches to [`ApiError::decode`].
pub(crate) fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|err| {
        tracing::debug!("Failed to decode response payload: {err}");
        ApiError::decode(None)
    })
}
