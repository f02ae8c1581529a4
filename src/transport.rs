// Shared HTTP transport
// One reqwest client (connection pool + cookie jar) shared by the token manager and the API client

use reqwest::Client;
use std::sync::RwLock;
use std::time::Duration;

use crate::error::ApiError;

/// Closable handle to the shared reqwest client.
///
/// The cookie store holds the HTTP-only refresh token set by the login
/// endpoint, so login, refresh and every API call must go through the same
/// transport.
pub struct HttpTransport {
    client: RwLock<Option<Client>>,
}

impl HttpTransport {
    /// Create a transport with a cookie store and the given request timeout.
    /// Redirects are not followed.
    pub fn new(request_timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(request_timeout)
            // 3xx responses go back to the caller as-is
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                ApiError::Internal(anyhow::Error::new(e).context("Failed to create HTTP client"))
            })?;

        Ok(Self::from_client(client))
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client) -> Self {
        Self {
            client: RwLock::new(Some(client)),
        }
    }

    /// Get a handle to the client, or `ApiError::Closed` after `close()`
    pub fn client(&self) -> Result<Client, ApiError> {
        let guard = self
            .client
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.clone().ok_or(ApiError::Closed)
    }

    /// Drop the client; the pool is released once in-flight requests finish
    pub fn close(&self) {
        let mut guard = self
            .client
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.take().is_some() {
            tracing::debug!("HTTP transport closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.client
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }
}
