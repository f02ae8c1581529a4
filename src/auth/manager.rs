use anyhow::anyhow;
use std::sync::{Arc, RwLock};

use super::jwt::{is_token_expired, DEFAULT_EXPIRY_BUFFER_SECS};
use super::refresh;
use super::single_flight::SingleFlight;
use crate::error::ApiError;
use crate::transport::HttpTransport;

/// Token manager
/// Holds the current access token and performs login/refresh with single-flight refresh
pub struct TokenManager {
    /// Shared transport; its cookie jar carries the refresh token
    transport: Arc<HttpTransport>,

    /// Current access token
    access_token: RwLock<Option<String>>,

    /// Serializes refresh attempts made by `get_valid_token`
    refresh_flight: SingleFlight,

    /// Seconds before `exp` at which a token is treated as expired
    expiry_buffer: i64,
}

impl TokenManager {
    /// Create a manager with no token yet
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self {
            transport,
            access_token: RwLock::new(None),
            refresh_flight: SingleFlight::new(),
            expiry_buffer: DEFAULT_EXPIRY_BUFFER_SECS,
        }
    }

    /// Create a manager that already holds `token`
    pub fn with_token(transport: Arc<HttpTransport>, token: impl Into<String>) -> Self {
        let manager = Self::new(transport);
        manager.store(token.into());
        manager
    }

    /// Authenticate with email/password and store the access token
    pub async fn login(&self, email: &str, password: &str, base_url: &str) -> Result<(), ApiError> {
        let client = self.transport.client()?;
        let token = refresh::login(&client, base_url, email, password).await?;
        self.store(token);
        Ok(())
    }

    /// Refresh the access token using the refresh cookie
    pub async fn refresh(&self, base_url: &str) -> Result<(), ApiError> {
        let client = self.transport.client()?;
        let token = refresh::refresh(&client, base_url).await?;
        self.store(token);
        Ok(())
    }

    /// Get a valid access token, refreshing if absent or expired.
    /// Concurrent callers share a single refresh and its outcome.
    pub async fn get_valid_token(&self, base_url: &str) -> Result<String, ApiError> {
        self.refresh_flight
            .run(
                || self.current_valid_token().is_some(),
                || self.refresh(base_url),
            )
            .await?;

        // A successful refresh always stores a token
        self.current_token()
            .ok_or_else(|| ApiError::Internal(anyhow!("No access token stored after refresh")))
    }

    /// The stored token, regardless of expiry
    pub fn current_token(&self) -> Option<String> {
        self.access_token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of completed refresh attempts made through `get_valid_token`
    pub fn refresh_count(&self) -> u64 {
        self.refresh_flight.completed_flights()
    }

    fn current_valid_token(&self) -> Option<String> {
        self.current_token()
            .filter(|token| !is_token_expired(token, self.expiry_buffer))
    }

    fn store(&self, token: String) {
        let mut guard = self
            .access_token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(token);
    }
}
