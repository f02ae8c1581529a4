// JWT expiry inspection
// Reads the `exp` claim without verifying the signature

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::Utc;
use serde_json::{Map, Value};

/// Default early-expiry window applied before the `exp` claim
pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 60;

/// Check whether a bearer token is expired or expires within `buffer_seconds`.
///
/// Malformed tokens (wrong segment count, undecodable payload, payload that
/// is not a JSON object, non-numeric `exp`) are reported as expired. A token
/// without an `exp` claim never expires.
pub fn is_token_expired(token: &str, buffer_seconds: i64) -> bool {
    match expiry_of(token) {
        Ok(None) => false,
        Ok(Some(exp)) => now_seconds() >= exp - buffer_seconds as f64,
        Err(()) => true,
    }
}

/// Extract the `exp` claim as seconds since the epoch
fn expiry_of(token: &str) -> Result<Option<f64>, ()> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(());
    }

    let payload = decode_segment(parts[1])?;
    let claims: Map<String, Value> = serde_json::from_slice(&payload).map_err(|_| ())?;

    match claims.get("exp") {
        None | Some(Value::Null) => Ok(None),
        Some(exp) => claim_as_f64(exp).map(Some),
    }
}

/// Base64url-decode a JWT segment, restoring stripped padding
fn decode_segment(segment: &str) -> Result<Vec<u8>, ()> {
    let mut padded = segment.to_string();
    let remainder = padded.len() % 4;
    if remainder != 0 {
        padded.push_str(&"=".repeat(4 - remainder));
    }
    URL_SAFE.decode(padded.as_bytes()).map_err(|_| ())
}

fn claim_as_f64(value: &Value) -> Result<f64, ()> {
    let exp = match value {
        Value::Number(n) => n.as_f64().ok_or(())?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| ())?,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => return Err(()),
    };
    if exp.is_nan() {
        return Err(());
    }
    Ok(exp)
}

fn now_seconds() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
pub(crate) mod test_support {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use serde_json::{json, Value};

    /// Build an unsigned JWT with the given payload
    pub fn make_jwt_with_payload(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{}.{}.fakesignature", header, payload)
    }

    /// Build an unsigned JWT expiring at `exp` (or never, for `None`)
    pub fn make_jwt(exp: Option<f64>) -> String {
        match exp {
            Some(exp) => make_jwt_with_payload(&json!({ "sub": "1", "exp": exp })),
            None => make_jwt_with_payload(&json!({ "sub": "1" })),
        }
    }

    pub fn now() -> f64 {
        chrono::Utc::now().timestamp() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{make_jwt, make_jwt_with_payload, now};
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_expired_token() {
        let token = make_jwt(Some(now() - 100.0));
        assert!(is_token_expired(&token, DEFAULT_EXPIRY_BUFFER_SECS));
    }

    #[test]
    fn test_valid_token() {
        let token = make_jwt(Some(now() + 3600.0));
        assert!(!is_token_expired(&token, DEFAULT_EXPIRY_BUFFER_SECS));
    }

    #[test]
    fn test_no_exp_claim_never_expires() {
        let token = make_jwt(None);
        assert!(!is_token_expired(&token, DEFAULT_EXPIRY_BUFFER_SECS));
        assert!(!is_token_expired(&token, 1_000_000));

        let token = make_jwt_with_payload(&json!({ "exp": null }));
        assert!(!is_token_expired(&token, DEFAULT_EXPIRY_BUFFER_SECS));
    }

    #[test]
    fn test_malformed_tokens_are_expired() {
        assert!(is_token_expired("not.a.valid.jwt.at.all", 60));
        assert!(is_token_expired("invalid", 60));
        assert!(is_token_expired("", 60));
        assert!(is_token_expired("a.b", 60));
        assert!(is_token_expired("header.!!!notbase64!!!.sig", 60));
    }

    #[test]
    fn test_non_object_payload_is_expired() {
        let token = make_jwt_with_payload(&json!([1, 2, 3]));
        assert!(is_token_expired(&token, 60));

        let token = make_jwt_with_payload(&json!("just a string"));
        assert!(is_token_expired(&token, 60));
    }

    #[test]
    fn test_exp_coercion() {
        let future = now() + 3600.0;
        let token = make_jwt_with_payload(&json!({ "exp": future.to_string() }));
        assert!(!is_token_expired(&token, 60));

        let token = make_jwt_with_payload(&json!({ "exp": "soon" }));
        assert!(is_token_expired(&token, 60));

        let token = make_jwt_with_payload(&json!({ "exp": { "at": future } }));
        assert!(is_token_expired(&token, 60));

        // true coerces to 1.0, long in the past
        let token = make_jwt_with_payload(&json!({ "exp": true }));
        assert!(is_token_expired(&token, 60));
    }

    #[test]
    fn test_buffer_boundary() {
        let near_expiry = make_jwt(Some(now() + 30.0));
        assert!(is_token_expired(&near_expiry, 60));

        let far_expiry = make_jwt(Some(now() + 120.0));
        assert!(!is_token_expired(&far_expiry, 60));
    }

    #[test]
    fn test_padding_is_restored() {
        // Payload lengths that leave 2 and 3 characters in the final quantum
        for sub in ["a", "ab", "abc", "abcd"] {
            let token = make_jwt_with_payload(&json!({ "sub": sub, "exp": now() + 3600.0 }));
            assert!(!is_token_expired(&token, 60), "sub={}", sub);
        }
    }

    proptest! {
        #[test]
        fn prop_past_exp_is_expired(k in 61i64..10_000_000, buffer in 0i64..60) {
            let token = make_jwt(Some(now() - k as f64));
            prop_assert!(is_token_expired(&token, buffer));
        }

        #[test]
        fn prop_future_exp_beyond_buffer_is_valid(k in 120i64..10_000_000, buffer in 0i64..60) {
            let token = make_jwt(Some(now() + k as f64));
            prop_assert!(!is_token_expired(&token, buffer));
        }

        #[test]
        fn prop_missing_exp_never_expires(buffer in -1_000_000i64..1_000_000) {
            let token = make_jwt(None);
            prop_assert!(!is_token_expired(&token, buffer));
        }

        #[test]
        fn prop_wrong_segment_count_is_expired(s in "[A-Za-z0-9_-]{0,40}(\\.[A-Za-z0-9_-]{0,40}){0,1}") {
            prop_assert!(is_token_expired(&s, 60));
        }

        #[test]
        fn prop_arbitrary_input_never_panics(s in ".*") {
            let _ = is_token_expired(&s, 60);
        }
    }
}
