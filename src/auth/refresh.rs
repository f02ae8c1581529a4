// Login and refresh requests against the VerifyWise auth endpoints

use reqwest::Client;
use serde_json::Value;

use super::types::{extract_token, LoginRequest};
use crate::error::ApiError;

pub const LOGIN_PATH: &str = "/api/users/login";
pub const REFRESH_PATH: &str = "/api/users/refresh-token";

/// Exchange email/password for an access token.
/// The response also sets the HTTP-only refresh cookie on the client.
pub async fn login(
    client: &Client,
    base_url: &str,
    email: &str,
    password: &str,
) -> Result<String, ApiError> {
    tracing::debug!(email = %email, "Logging in to VerifyWise");

    let request = client
        .post(format!("{}{}", base_url, LOGIN_PATH))
        .json(&LoginRequest { email, password });

    let token = request_token(request, LOGIN_PATH).await?;
    tracing::debug!("Login successful; access token received");
    Ok(token)
}

/// Exchange the refresh cookie held by the client for a new access token
pub async fn refresh(client: &Client, base_url: &str) -> Result<String, ApiError> {
    tracing::debug!("Refreshing access token");

    let request = client.post(format!("{}{}", base_url, REFRESH_PATH));

    let token = request_token(request, REFRESH_PATH).await?;
    tracing::debug!("Token refreshed successfully");
    Ok(token)
}

async fn request_token(request: reqwest::RequestBuilder, path: &str) -> Result<String, ApiError> {
    let response = request.send().await.map_err(|e| ApiError::Network {
        path: path.to_string(),
        source: e,
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| ApiError::Network {
        path: path.to_string(),
        source: e,
    })?;

    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), path = %path, "Authentication request rejected");
        return Err(ApiError::api(status.as_u16(), &body));
    }

    let data: Value = serde_json::from_str(&body).map_err(|_| {
        ApiError::AuthResponse(format!("{} returned a non-JSON body", path))
    })?;

    extract_token(&data)
}
