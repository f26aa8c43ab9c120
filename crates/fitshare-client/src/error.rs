//! Client error types

use fitshare_crypto::CryptoError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Backend refused the device public key registration
    #[error("public key registration rejected ({status}): {message}")]
    RegistrationRejected { status: u16, message: String },

    /// Local key or device database cannot be opened
    #[error("local storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Cryptographic error
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// JSON (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration or input
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Build an API error from a response status and body
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.trim().to_string()
                }
            });

        Self::Api { status, message }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Check if the access token was refused
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }

    /// Check if this is a local storage failure
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }

    /// Notification text for the end user
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Crypto(CryptoError::CryptoUnavailable(_)) => "Cannot secure this session.",
            Self::RegistrationRejected { .. } => {
                "Could not register this device. Encrypted posts cannot be read until the next login."
            }
            Self::StorageUnavailable(_) => {
                "Keys could not be saved on this device. You will be asked to set it up again next time."
            }
            Self::Api { status: 401 | 403, .. } => "Your session has expired. Please log in again.",
            _ => "Something went wrong. Please try again.",
        }
    }
}
