use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{Credentials, SingleFlight, TokenManager};
use crate::config::ClientConfig;
use crate::error::{transport_error_kind, ApiError};
use crate::transport::HttpTransport;

/// Authenticated HTTP client for the VerifyWise REST API
///
/// - Logs in once with the configured credentials
/// - Injects a valid bearer token on every request, refreshing as needed
/// - Retries GET requests on transport failures with exponential backoff
/// - Normalizes error responses into `ApiError`
pub struct ApiClient {
    /// VerifyWise API base URL, without trailing slash
    base_url: String,

    /// Credentials for the initial login
    credentials: Credentials,

    /// Shared HTTP transport (connection pool + refresh cookie)
    transport: Arc<HttpTransport>,

    /// Access token lifecycle
    token_manager: Arc<TokenManager>,

    /// Set once the initial login has succeeded
    authenticated: AtomicBool,

    /// Serializes the initial login
    login_flight: SingleFlight,

    /// Maximum number of GET attempts
    max_retries: u32,

    /// Base delay for exponential backoff
    base_delay: Duration,
}

impl ApiClient {
    /// Create a new client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
        let token_manager = Arc::new(TokenManager::new(transport.clone()));
        Ok(Self::with_parts(config, transport, token_manager))
    }

    /// Create a client around an existing transport and token manager
    pub fn with_parts(
        config: &ClientConfig,
        transport: Arc<HttpTransport>,
        token_manager: Arc<TokenManager>,
    ) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: Credentials::new(config.email.clone(), config.password.clone()),
            transport,
            token_manager,
            authenticated: AtomicBool::new(false),
            login_flight: SingleFlight::new(),
            max_retries: config.max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Override the backoff base delay (1 second by default)
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.token_manager
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Perform the initial login once; concurrent first callers share it
    pub async fn ensure_authenticated(&self) -> Result<(), ApiError> {
        self.login_flight
            .run(
                || self.authenticated.load(Ordering::Acquire),
                || async {
                    self.token_manager
                        .login(
                            &self.credentials.email,
                            &self.credentials.password,
                            &self.base_url,
                        )
                        .await?;
                    self.authenticated.store(true, Ordering::Release);
                    tracing::info!(base_url = %self.base_url, "Authenticated with VerifyWise");
                    Ok(())
                },
            )
            .await
    }

    /// Authenticated GET, retried on transport failures
    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.get_with_query::<()>(path, None).await
    }

    /// Authenticated GET with query parameters, retried on transport failures
    pub async fn get_with_query<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: Option<&Q>,
    ) -> Result<Value, ApiError> {
        let token = self.bearer_token().await?;
        let attempts = self.max_retries.max(1);
        let mut attempt = 0;

        loop {
            let mut request = self.request(Method::GET, path, &token)?;
            if let Some(query) = query {
                request = request.query(query);
            }

            tracing::debug!(
                path = %path,
                attempt = attempt + 1,
                max_attempts = attempts,
                "Executing GET attempt"
            );

            match send(request).await {
                Ok((status, body)) => return handle_response(path, status, &body),
                Err(e) => {
                    let error_kind = transport_error_kind(&e);

                    if attempt + 1 >= attempts {
                        tracing::error!(
                            error_kind = error_kind,
                            error = %e,
                            path = %path,
                            total_attempts = attempt + 1,
                            "GET request failed after all retries"
                        );
                        return Err(ApiError::Network {
                            path: path.to_string(),
                            source: e,
                        });
                    }

                    let delay = self.calculate_backoff_delay(attempt);
                    tracing::warn!(
                        error_kind = error_kind,
                        error = %e,
                        path = %path,
                        "GET failed, retrying after {}ms (attempt {}/{})",
                        delay.as_millis(),
                        attempt + 1,
                        attempts
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Authenticated POST with an optional JSON body
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        self.send_json(Method::POST, path, body).await
    }

    /// Authenticated POST with a form-encoded body
    pub async fn post_form<F: Serialize + ?Sized>(
        &self,
        path: &str,
        form: &F,
    ) -> Result<Value, ApiError> {
        let token = self.bearer_token().await?;
        let request = self.request(Method::POST, path, &token)?.form(form);
        self.send_once(path, request).await
    }

    /// Authenticated PUT with an optional JSON body
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, path, body).await
    }

    /// Authenticated PATCH with an optional JSON body
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        self.send_json(Method::PATCH, path, body).await
    }

    /// Authenticated DELETE
    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        let token = self.bearer_token().await?;
        let request = self.request(Method::DELETE, path, &token)?;
        self.send_once(path, request).await
    }

    /// Release the underlying transport. Later requests fail with `ApiError::Closed`.
    pub fn close(&self) {
        self.transport.close();
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    /// Single-attempt request for verbs that are not safe to replay
    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        let token = self.bearer_token().await?;
        let mut request = self.request(method, path, &token)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send_once(path, request).await
    }

    async fn send_once(&self, path: &str, request: RequestBuilder) -> Result<Value, ApiError> {
        match send(request).await {
            Ok((status, body)) => handle_response(path, status, &body),
            Err(e) => {
                tracing::error!(
                    error_kind = transport_error_kind(&e),
                    error = %e,
                    path = %path,
                    "HTTP request failed"
                );
                Err(ApiError::Network {
                    path: path.to_string(),
                    source: e,
                })
            }
        }
    }

    async fn bearer_token(&self) -> Result<String, ApiError> {
        if self.transport.is_closed() {
            return Err(ApiError::Closed);
        }
        self.ensure_authenticated().await?;
        self.token_manager.get_valid_token(&self.base_url).await
    }

    fn request(&self, method: Method, path: &str, token: &str) -> Result<RequestBuilder, ApiError> {
        let client = self.transport.client()?;
        Ok(client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(token))
    }

    /// Backoff before retry number `attempt + 1`: base_delay * 2^attempt
    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }
}

/// Send a request and read the full body.
/// Failures here never carry an HTTP status.
async fn send(request: RequestBuilder) -> Result<(StatusCode, String), reqwest::Error> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

/// Map a response to a JSON value or an `ApiError`
///
/// - 404: `NotFound`
/// - other 4xx/5xx: `Api` with a truncated body excerpt
/// - otherwise: parsed JSON, or the raw text when the body is not JSON
pub fn handle_response(path: &str, status: StatusCode, body: &str) -> Result<Value, ApiError> {
    if status == StatusCode::NOT_FOUND {
        tracing::debug!(path = %path, "Resource not found");
        return Err(ApiError::NotFound {
            path: path.to_string(),
        });
    }

    if status.is_client_error() || status.is_server_error() {
        tracing::warn!(
            status = status.as_u16(),
            path = %path,
            "Received error response"
        );
        return Err(ApiError::api(status.as_u16(), body));
    }

    Ok(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
}
