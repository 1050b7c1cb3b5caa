//! Access and refresh tokens.
//!
//! An access token is an HS256 JWT whose claims carry the holder's effective
//! permission names, so guarding a route never touches the database. A
//! refresh token is opaque; the database keeps only its SHA-256 digest.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use kublade_core::types::DbId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::JwtConfig;

/// Value of `token_type` in auth responses.
pub const TOKEN_TYPE: &str = "Bearer";

/// Seconds of clock skew tolerated when checking `exp`.
const LEEWAY_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to sign access token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("access token rejected: {0}")]
    Rejected(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: DbId,
    pub email: String,
    /// Role grants unioned with direct grants when the token was issued.
    pub permissions: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl JwtConfig {
    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_mins)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_expiry_days)
    }

    pub fn sign(
        &self,
        user_id: DbId,
        email: &str,
        permissions: Vec<String>,
    ) -> Result<String, TokenError> {
        let issued_at = Utc::now();
        let claims = AccessClaims {
            sub: user_id,
            email: email.to_string(),
            permissions,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.access_ttl()).timestamp(),
            jti: Uuid::new_v4(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(TokenError::Sign)
    }

    /// Check signature and expiry.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = LEEWAY_SECS;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(TokenError::Rejected)
    }
}

/// A freshly minted refresh token. `token` goes to the client once; only
/// `digest` is stored.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub token: String,
    pub digest: String,
}

impl RefreshToken {
    pub fn generate() -> Self {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let digest = Self::digest_of(&token);
        Self { token, digest }
    }

    /// Hex SHA-256 of a presented token, for lookup.
    pub fn digest_of(token: &str) -> String {
        format!("{:x}", Sha256::digest(token.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use kublade_core::types::new_id;

    use super::*;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        }
    }

    #[test]
    fn claims_survive_signing() {
        let jwt = config("signing-secret-for-tests");
        let user_id = new_id();
        let perms = vec!["ui.projects.view".to_string(), "ui.templates.*".to_string()];

        let token = jwt.sign(user_id, "ops@kublade.test", perms.clone()).unwrap();
        let claims = jwt.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.permissions, perms);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = config("signing-secret-for-tests");
        let now = Utc::now().timestamp();
        let stale = AccessClaims {
            sub: new_id(),
            email: "ops@kublade.test".into(),
            permissions: vec![],
            iat: now - 3600,
            exp: now - 60,
            jti: Uuid::new_v4(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &stale,
            &EncodingKey::from_secret(jwt.secret.as_bytes()),
        )
        .unwrap();

        assert_matches!(jwt.verify(&token), Err(TokenError::Rejected(_)));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let token = config("first").sign(new_id(), "a@kublade.test", vec![]).unwrap();
        assert!(config("second").verify(&token).is_err());
    }

    #[test]
    fn refresh_digest_matches_lookup() {
        let minted = RefreshToken::generate();
        assert_eq!(minted.digest, RefreshToken::digest_of(&minted.token));
        assert_eq!(minted.digest.len(), 64);
        assert_ne!(RefreshToken::generate().token, minted.token);
    }
}
