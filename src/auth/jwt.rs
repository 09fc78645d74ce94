//! JWT Token Handler
//! Mission: Issue, validate and refresh signed tokens

use crate::auth::models::Claims;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// Why a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    InvalidSignature,
    TokenExpired,
    RefreshExpired,
    Signing,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::InvalidSignature => write!(f, "invalid token signature"),
            TokenError::TokenExpired => write!(f, "token expired"),
            TokenError::RefreshExpired => write!(f, "refresh horizon passed"),
            TokenError::Signing => write!(f, "token signing failed"),
        }
    }
}

impl std::error::Error for TokenError {}

/// A signed token together with the claims encoded in it.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedToken {
    pub token: String,
    pub expire: DateTime<Utc>,
    pub claims: Claims,
}

/// JWT Handler for token operations
///
/// Holds the process signing key and realm label; constructed once at
/// startup and shared by reference, never read from ambient state.
pub struct JwtHandler {
    secret: String,
    realm: String,
    timeout: Duration,
    max_refresh: Duration,
}

impl JwtHandler {
    /// Create a handler with the default one-hour token timeout and
    /// one-hour refresh horizon.
    pub fn new(secret: String, realm: String) -> Self {
        Self {
            secret,
            realm,
            timeout: Duration::minutes(60),
            max_refresh: Duration::minutes(60),
        }
    }

    /// Override token lifetime and refresh horizon.
    pub fn with_lifetimes(mut self, timeout: Duration, max_refresh: Duration) -> Self {
        self.timeout = timeout;
        self.max_refresh = max_refresh;
        self
    }

    /// Challenge domain label, surfaced in WWW-Authenticate headers.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Issue a fresh token for a verified identity.
    pub fn issue(&self, user_id: i64, is_admin: bool) -> Result<SignedToken> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            is_admin,
            iat: now.timestamp(),
            exp: (now + self.timeout).timestamp(),
        };
        self.sign(claims)
    }

    fn sign(&self, claims: Claims) -> Result<SignedToken> {
        let expire =
            DateTime::<Utc>::from_timestamp(claims.exp, 0).context("Token expiry out of range")?;

        debug!(
            sub = claims.sub,
            is_admin = claims.is_admin,
            exp = claims.exp,
            "Signing token"
        );

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to sign token")?;

        Ok(SignedToken {
            token,
            expire,
            claims,
        })
    }

    /// Validate a token and extract its claims.
    ///
    /// The signature must verify under the current signing key and `exp`
    /// must be strictly in the future (zero leeway). A payload that does not
    /// decode into typed claims is rejected the same as a bad signature.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(TokenError::TokenExpired),
                _ => Err(TokenError::InvalidSignature),
            },
        }
    }

    /// Re-issue a still-refreshable token with a fresh expiry.
    ///
    /// Expiry is ignored here; the token is renewable while the current time
    /// is within `max_refresh` of the original issuance. Subject and role
    /// claims carry over unchanged, as does `iat`, so a chain of refreshes
    /// cannot outlive the horizon.
    pub fn refresh(&self, token: &str) -> Result<SignedToken, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| TokenError::InvalidSignature)?;

        let claims = data.claims;
        let now = Utc::now();
        if now.timestamp() > claims.iat + self.max_refresh.num_seconds() {
            return Err(TokenError::RefreshExpired);
        }

        let renewed = Claims {
            exp: (now + self.timeout).timestamp(),
            ..claims
        };
        self.sign(renewed).map_err(|_| TokenError::Signing)
    }
}
