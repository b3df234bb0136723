// src/auth/token.rs
//! Bearer token codec. Reads the payload segment without verifying the
//! signature; the backend stays the authority on validity.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Tokens are treated as expired this long before their `exp` claim.
pub const EXPIRY_BUFFER_MS: i64 = 30_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPayload {
    #[serde(default, deserialize_with = "lenient_subject")]
    pub sub: Option<String>,
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<i64>,
    #[serde(default, deserialize_with = "numeric_date")]
    pub iat: Option<i64>,
    pub username: Option<String>,
    pub role: Option<String>,
}

/// `sub` may be issued as a string or a number.
fn lenient_subject<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(subject)) => Some(subject),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

/// NumericDate seconds; fractional values are truncated.
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|seconds| seconds.is_finite())
                .map(|seconds| seconds.trunc() as i64)
        }),
        _ => None,
    })
}

/// Decode the payload of a `header.payload.signature` token.
pub fn decode(token: &str) -> Option<TokenPayload> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    let raw = segments[1];
    let bytes = URL_SAFE_NO_PAD
        .decode(raw.trim_end_matches('='))
        .or_else(|_| URL_SAFE.decode(raw))
        .ok()?;

    serde_json::from_slice(&bytes).ok()
}

pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now().timestamp_millis())
}

pub fn is_expired_at(token: &str, now_ms: i64) -> bool {
    match decode(token).and_then(|payload| payload.exp) {
        Some(exp) => now_ms >= exp.saturating_mul(1000).saturating_sub(EXPIRY_BUFFER_MS),
        None => true,
    }
}

pub fn is_valid_token(token: &str) -> bool {
    !token.is_empty() && !is_expired(token)
}

/// Wall-clock expiry of the token, ignoring the safety buffer.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let exp = decode(token)?.exp?;
    Utc.timestamp_opt(exp, 0).single()
}
