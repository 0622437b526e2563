use std::str::FromStr;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use crate::{config::JwtConfig, error::ApiError, state::AppState};

/// Why a token was rejected. Clients only ever see a generic 401; the kind is
/// for logs.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("token signature invalid")]
    SignatureInvalid,
    #[error("token expired")]
    Expired,
    #[error("token malformed")]
    Malformed,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl JwtKeys {
    /// The secret is symmetric, so only the HMAC family is accepted.
    pub fn from_config(cfg: &JwtConfig) -> anyhow::Result<Self> {
        let algorithm = Algorithm::from_str(&cfg.algorithm)
            .map_err(|e| anyhow::anyhow!("unknown signing algorithm {:?}: {}", cfg.algorithm, e))?;
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            anyhow::bail!("signing algorithm {:?} is not an HMAC algorithm", cfg.algorithm);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm,
            ttl: Duration::minutes(cfg.ttl_minutes),
        })
    }

    pub fn sign(&self, subject: &str) -> anyhow::Result<String> {
        self.sign_at(subject, OffsetDateTime::now_utc())
    }

    fn sign_at(&self, subject: &str, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + self.ttl;
        let claims = Claims {
            sub: subject.to_owned(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(subject = %subject, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        // No leeway: a token is rejected at exactly its expiration instant.
        validation.leeway = 0;
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => {
                debug!(subject = %data.claims.sub, "jwt verified");
                Ok(data.claims)
            }
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::ImmatureSignature => AuthError::SignatureInvalid,
                _ => AuthError::Malformed,
            }),
        }
    }
}

/// Extracts the bearer token and yields the verified subject email.
pub struct AuthUser(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let claims = keys.verify(token).map_err(|kind| {
            warn!(kind = ?kind, "token rejected");
            ApiError::Unauthorized
        })?;

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, algorithm: &str, ttl_minutes: i64) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            algorithm: algorithm.into(),
            ttl_minutes,
        })
        .expect("keys should construct")
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys("dev-secret", "HS256", 5);
        let token = keys.sign("a@x.com").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "a@x.com");
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret", "HS256", 5);
        let issued = OffsetDateTime::now_utc() - Duration::minutes(6);
        let token = keys.sign_at("a@x.com", issued).expect("sign");
        assert_eq!(keys.verify(&token).unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let keys = make_keys("dev-secret", "HS256", 5);
        let other = make_keys("other-secret", "HS256", 5);
        let token = other.sign("a@x.com").expect("sign");
        assert_eq!(keys.verify(&token).unwrap_err(), AuthError::SignatureInvalid);
    }

    #[test]
    fn verify_rejects_wrong_algorithm() {
        let keys = make_keys("dev-secret", "HS256", 5);
        let other = make_keys("dev-secret", "HS384", 5);
        let token = other.sign("a@x.com").expect("sign");
        assert_eq!(keys.verify(&token).unwrap_err(), AuthError::SignatureInvalid);
    }

    #[test]
    fn verify_rejects_malformed_token() {
        let keys = make_keys("dev-secret", "HS256", 5);
        assert_eq!(keys.verify("garbage").unwrap_err(), AuthError::Malformed);
        assert_eq!(keys.verify("a.b.c").unwrap_err(), AuthError::Malformed);
        assert_eq!(keys.verify("").unwrap_err(), AuthError::Malformed);
    }

    #[test]
    fn verify_rejects_tampered_token() {
        let keys = make_keys("dev-secret", "HS256", 5);
        let token = keys.sign("a@x.com").expect("sign");
        let mut chars: Vec<char> = token.chars().collect();
        let mid = chars.len() / 2;
        chars[mid] = if chars[mid] == 'x' { 'y' } else { 'x' };
        let tampered: String = chars.into_iter().collect();
        assert!(keys.verify(&tampered).is_err());
    }

    #[test]
    fn from_config_rejects_non_hmac_algorithms() {
        assert!(JwtKeys::from_config(&JwtConfig {
            secret: "s".into(),
            algorithm: "RS256".into(),
            ttl_minutes: 5,
        })
        .is_err());
        assert!(JwtKeys::from_config(&JwtConfig {
            secret: "s".into(),
            algorithm: "bogus".into(),
            ttl_minutes: 5,
        })
        .is_err());
    }
}
