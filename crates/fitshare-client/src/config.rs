//! Client configuration

use fitshare_crypto::DEFAULT_KEY_BITS;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Backend endpoint URL
    pub endpoint: String,
    /// Access token (JWT) handed over by the login flow
    pub access_token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Modulus size for newly provisioned device keys
    pub key_bits: usize,
    /// Directory for the durable key and device databases; `None` keeps them in memory
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            access_token: None,
            timeout: Duration::from_secs(30),
            user_agent: format!("fitshare-client/{}", env!("CARGO_PKG_VERSION")),
            key_bits: DEFAULT_KEY_BITS,
            data_dir: None,
        }
    }
}

impl Config {
    /// Create a new config with the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the access token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the modulus size for new device keys
    pub fn with_key_bits(mut self, bits: usize) -> Self {
        self.key_bits = bits;
        self
    }

    /// Persist keys and device ids under the given directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Build the base URL for API requests
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}
