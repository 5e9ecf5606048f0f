// Client configuration. There is exactly one setting, the server address,
// read from the environment with a literal fallback.

use url::Url;

use crate::error::{Result, UploadError};

/// Address used when `UPLOAD_SERVER_URL` is not set.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:5000";

/// Environment variable overriding the server address.
pub const SERVER_URL_ENV: &str = "UPLOAD_SERVER_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: Url,
}

impl ClientConfig {
    /// Build the configuration from `UPLOAD_SERVER_URL`, falling back to
    /// `ws://localhost:5000`.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var(SERVER_URL_ENV).unwrap_or_else(|_| DEFAULT_SERVER_URL.into());
        Self::parse(&raw)
    }

    /// Parse and validate a server address. Only plain `ws://` is accepted:
    /// the transport is built without TLS support.
    pub fn parse(raw: &str) -> Result<Self> {
        let server_url = Url::parse(raw.trim())?;
        if server_url.scheme() != "ws" {
            return Err(UploadError::InvalidUrl(format!(
                "unsupported scheme `{}` in {}",
                server_url.scheme(),
                server_url
            )));
        }
        if server_url.host_str().is_none() {
            return Err(UploadError::InvalidUrl(format!("missing host in {}", server_url)));
        }
        Ok(ClientConfig { server_url })
    }
}
