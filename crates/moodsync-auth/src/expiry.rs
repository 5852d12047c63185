//! Local expiry check for access tokens
//!
//! Access tokens are JWT-shaped: `header.payload.signature`, with the payload
//! a base64url JSON object that may carry `exp` (seconds since epoch). The
//! client never verifies signatures; it only peeks at `exp` to refresh a
//! token before the server would reject it.
//!
//! Anything that cannot be decoded is treated as still valid. The server is
//! authoritative and will answer 401 if the token is actually bad.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

/// Claims the client cares about. Everything else in the payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the unix epoch
    #[serde(default)]
    pub exp: Option<f64>,
}

/// Why a token's payload could not be read.
#[derive(Debug, thiserror::Error)]
pub enum MalformedCredential {
    #[error("expected 3 dot-separated segments, found {0}")]
    SegmentCount(usize),

    #[error("payload is not base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("payload is not a JSON claims object: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Decode the payload segment of `token` into `Claims`.
///
/// Accepts both the url-safe and standard base64 alphabets, padded or not.
pub fn decode_claims(token: &str) -> Result<Claims, MalformedCredential> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(MalformedCredential::SegmentCount(segments.len()));
    }

    let payload: String = segments[1]
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Whether `token` is expired, or expires within `skew_secs`.
pub fn is_expired(token: &str, skew_secs: u64) -> bool {
    is_expired_at(token, skew_secs, now_secs())
}

/// `is_expired` against an explicit clock (`now` in seconds since epoch).
///
/// Malformed tokens and tokens without a (non-zero) `exp` never expire locally.
pub fn is_expired_at(token: &str, skew_secs: u64, now: u64) -> bool {
    let claims = match decode_claims(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::trace!(error = %e, "access token not decodable, assuming valid");
            return false;
        }
    };

    match claims.exp {
        Some(exp) if exp != 0.0 => exp - skew_secs as f64 <= now as f64,
        _ => false,
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Unsigned JWT-shaped token carrying `claims` as its payload.
    pub(crate) fn token_with_claims(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.signature")
    }

    const NOW: u64 = 1_760_000_000;

    #[test]
    fn token_inside_skew_window_is_expired() {
        let token = token_with_claims(serde_json::json!({ "exp": NOW + 10 }));
        assert!(is_expired_at(&token, 30, NOW));
    }

    #[test]
    fn token_outside_skew_window_is_valid() {
        let token = token_with_claims(serde_json::json!({ "exp": NOW + 60 }));
        assert!(!is_expired_at(&token, 30, NOW));
    }

    #[test]
    fn boundary_counts_as_expired() {
        let token = token_with_claims(serde_json::json!({ "exp": NOW + 30 }));
        assert!(is_expired_at(&token, 30, NOW));
        assert!(!is_expired_at(&token, 29, NOW));
    }

    #[test]
    fn past_expiry_is_expired_with_zero_skew() {
        let token = token_with_claims(serde_json::json!({ "exp": NOW - 1 }));
        assert!(is_expired_at(&token, 0, NOW));
    }

    #[test]
    fn real_clock_uses_wall_time() {
        let soon = token_with_claims(serde_json::json!({ "exp": now_secs() + 10 }));
        let later = token_with_claims(serde_json::json!({ "exp": now_secs() + 3600 }));
        assert!(is_expired(&soon, 30));
        assert!(!is_expired(&later, 30));
    }

    #[test]
    fn malformed_tokens_fail_open() {
        assert!(!is_expired("not-a-jwt", 30));
        assert!(!is_expired("a.b", 30));
        assert!(!is_expired("a.!!!.c", 30));
        assert!(!is_expired("", 30));
    }

    #[test]
    fn non_json_payload_fails_open() {
        let payload = URL_SAFE_NO_PAD.encode("plain text");
        let token = format!("h.{payload}.s");
        assert!(matches!(
            decode_claims(&token),
            Err(MalformedCredential::Claims(_))
        ));
        assert!(!is_expired_at(&token, 30, NOW));
    }

    #[test]
    fn missing_exp_never_expires() {
        let token = token_with_claims(serde_json::json!({ "sub": "user-1" }));
        assert_eq!(decode_claims(&token).unwrap().exp, None);
        assert!(!is_expired_at(&token, 30, u64::MAX / 2));
    }

    #[test]
    fn segment_count_is_reported() {
        assert!(matches!(
            decode_claims("a.b"),
            Err(MalformedCredential::SegmentCount(2))
        ));
        assert!(matches!(
            decode_claims("a.b.c.d"),
            Err(MalformedCredential::SegmentCount(4))
        ));
    }

    #[test]
    fn standard_alphabet_and_padding_are_accepted() {
        use base64::engine::general_purpose::STANDARD;
        // Standard alphabet output keeps its '=' padding
        let claims = serde_json::json!({ "exp": NOW + 5, "n": "?>?>" }).to_string();
        let payload = STANDARD.encode(claims);
        let token = format!("h.{payload}.s");
        assert_eq!(decode_claims(&token).unwrap().exp, Some((NOW + 5) as f64));
    }

    #[test]
    fn fractional_exp_is_supported() {
        let token = token_with_claims(serde_json::json!({ "exp": NOW as f64 + 30.5 }));
        assert!(!is_expired_at(&token, 30, NOW));
    }
}
