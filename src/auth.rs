use anyhow::{Context, Result};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Prefix of the subprotocol entry that carries the session token. Browser
/// clients cannot set arbitrary headers on a WebSocket upgrade, so the
/// credential rides in `Sec-WebSocket-Protocol` instead.
pub const TOKEN_PROTOCOL_PREFIX: &str = "access_token.";

/// How long issued session tokens stay valid.
pub const TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Claims carried by a session token. The token grants access to a single
/// session and carries no caller identity.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iat: u64,
    pub exp: u64,
}

/// Signs a fresh session token. The token-issuing endpoint shares this
/// signing logic with the relay through the configured secret.
pub fn issue_token(secret: &str, ttl: Duration) -> Result<String> {
    let now = get_current_timestamp();
    let claims = SessionClaims {
        iat: now,
        exp: now + ttl.as_secs(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to sign session token")
}

fn verify_token(token: &str, secret: &str) -> bool {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .is_ok()
}

/// Picks the `access_token.`-prefixed entry out of a comma-separated
/// subprotocol list and verifies the embedded token against the shared
/// secret. Returns the exact matched entry so the caller can echo it back
/// as the negotiated subprotocol, or `None` if no entry carries a valid
/// token. Expired, malformed, and missing credentials are indistinguishable
/// to the caller.
#[must_use]
pub fn authenticate(offered_protocols: &str, secret: &str) -> Option<String> {
    let entry = offered_protocols
        .split(',')
        .map(str::trim)
        .find(|p| p.starts_with(TOKEN_PROTOCOL_PREFIX))?;
    let token = entry.strip_prefix(TOKEN_PROTOCOL_PREFIX)?;
    if verify_token(token, secret) {
        Some(entry.to_string())
    } else {
        debug!("Session token failed verification");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-signing-secret";

    fn expired_token() -> String {
        let now = get_current_timestamp();
        let claims = SessionClaims {
            iat: now - 7200,
            exp: now - 3600,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_fresh_token() {
        let token = issue_token(SECRET, TOKEN_TTL).unwrap();
        let offered = format!("access_token.{token}");
        assert_eq!(authenticate(&offered, SECRET), Some(offered.clone()));
    }

    #[test]
    fn returns_exact_entry_from_list() {
        let token = issue_token(SECRET, TOKEN_TTL).unwrap();
        let entry = format!("access_token.{token}");
        let offered = format!("chat, {entry}, superchat");
        assert_eq!(authenticate(&offered, SECRET), Some(entry));
    }

    #[test]
    fn rejects_missing_entry() {
        assert_eq!(authenticate("chat, superchat", SECRET), None);
        assert_eq!(authenticate("", SECRET), None);
    }

    #[test]
    fn rejects_expired_token() {
        let offered = format!("access_token.{}", expired_token());
        assert_eq!(authenticate(&offered, SECRET), None);
    }

    #[test]
    fn rejects_foreign_signature() {
        let token = issue_token("some-other-secret", TOKEN_TTL).unwrap();
        let offered = format!("access_token.{token}");
        assert_eq!(authenticate(&offered, SECRET), None);
    }

    #[test]
    fn rejects_malformed_token() {
        assert_eq!(authenticate("access_token.not-a-jwt", SECRET), None);
    }
}
