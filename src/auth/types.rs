// Authentication types

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// Response fields that may carry the access token, in priority order.
/// VerifyWise has used each of these names across releases.
pub const TOKEN_FIELDS: [&str; 3] = ["token", "accessToken", "access_token"];

/// Login request body
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Extract the access token from a login or refresh response body.
///
/// The first field in `TOKEN_FIELDS` holding a non-empty value wins.
pub fn extract_token(body: &Value) -> Result<String, ApiError> {
    let Some(object) = body.as_object() else {
        return Err(ApiError::AuthResponse(
            "response body is not a JSON object".to_string(),
        ));
    };

    for field in TOKEN_FIELDS {
        let token = match object.get(field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        if let Some(token) = token {
            return Ok(token);
        }
    }

    let keys: Vec<&str> = object.keys().map(String::as_str).collect();
    Err(ApiError::AuthResponse(format!(
        "no token field found in response (fields: {:?})",
        keys
    )))
}
