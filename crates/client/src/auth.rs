//! HS256 bearer tokens for the authenticated engine endpoint.
//!
//! The engine API authenticates every request with a JWT whose only claim is `iat`. The execution
//! client rejects tokens whose `iat` is further than [`JWT_IAT_WINDOW`] from its own clock, so a
//! token is minted right before each privileged call and thrown away afterwards.

use crate::constants::JWT_IAT_WINDOW;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use thiserror::Error;

/// Errors produced while minting or verifying an engine token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The shared secret is empty.
    #[error("JWT secret is empty")]
    EmptySecret,
    /// The signing primitive rejected the input.
    #[error("Failed to sign JWT: {0}")]
    Signing(String),
    /// The token is malformed or its signature does not match the secret.
    #[error("Invalid JWT: {0}")]
    InvalidToken(String),
    /// The token's `iat` claim is too far from the verifier's clock.
    #[error("JWT issued {drift:?} away from now, allowed window is {allowed:?}")]
    IssuedOutsideWindow {
        /// Absolute distance between `iat` and now.
        drift: Duration,
        /// The accepted window.
        allowed: Duration,
    },
    /// A timestamp predates the unix epoch.
    #[error("System time is before the unix epoch")]
    Clock,
}

/// The claims carried by an engine token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issued-at, in seconds since the unix epoch.
    pub iat: u64,
}

/// Mints a token for `secret` carrying `issued_at` as its `iat` claim.
pub fn mint_token(secret: &[u8], issued_at: SystemTime) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::EmptySecret);
    }
    let claims = Claims { iat: unix_seconds(issued_at)? };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Verifies `token` against `secret` and checks that it was issued within [`JWT_IAT_WINDOW`] of
/// `now`, in either direction.
pub fn verify_token(secret: &[u8], token: &str, now: SystemTime) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::EmptySecret);
    }

    // Engine tokens carry no `exp`; freshness is judged on `iat` alone.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    let drift = Duration::from_secs(unix_seconds(now)?.abs_diff(data.claims.iat));
    if drift > JWT_IAT_WINDOW {
        return Err(AuthError::IssuedOutsideWindow { drift, allowed: JWT_IAT_WINDOW });
    }
    Ok(data.claims)
}

fn unix_seconds(time: SystemTime) -> Result<u64, AuthError> {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).map_err(|_| AuthError::Clock)
}

/// Mints engine tokens from a shared secret.
///
/// The issuer holds no token state: every call to [`TokenIssuer::mint`] signs a new token with the
/// current time.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenIssuer {
    secret: Vec<u8>,
}

impl TokenIssuer {
    /// Creates a new issuer for the given raw secret bytes.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    /// Mints a token issued now.
    pub fn mint(&self) -> Result<String, AuthError> {
        self.mint_at(SystemTime::now())
    }

    /// Mints a token issued at `issued_at`.
    pub fn mint_at(&self, issued_at: SystemTime) -> Result<String, AuthError> {
        mint_token(&self.secret, issued_at)
    }

    /// Verifies a token against this issuer's secret.
    pub fn verify(&self, token: &str, now: SystemTime) -> Result<Claims, AuthError> {
        verify_token(&self.secret, token, now)
    }

    /// Returns the raw secret.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer").field("secret", &"<redacted>").finish()
    }
}
