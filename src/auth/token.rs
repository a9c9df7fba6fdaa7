use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::db::{Role, UserId};

/// Claims of an access token. Signed with HS256, checked without touching the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("missing token")]
    Missing,
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Signing material shared by the token issuer and the gate.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue(&self, user_id: UserId, role: Role, ttl: Duration) -> Result<String, jsonwebtoken::errors::Error> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            user_id,
            role,
            iat: now,
            exp: now + ttl.whole_seconds(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Missing);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify() {
        let keys = JwtKeys::from_secret(b"test-secret");
        let token = keys.issue(7, Role::Teacher, Duration::hours(1)).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.role, Role::Teacher);
    }

    #[test]
    fn rejects_foreign_expired_and_empty() {
        let keys = JwtKeys::from_secret(b"test-secret");
        let other = JwtKeys::from_secret(b"other-secret");

        let foreign = other.issue(1, Role::Student, Duration::hours(1)).unwrap();
        assert_eq!(keys.verify(&foreign), Err(TokenError::Invalid));

        let expired = keys.issue(1, Role::Student, Duration::seconds(-60)).unwrap();
        assert_eq!(keys.verify(&expired), Err(TokenError::Expired));

        assert_eq!(keys.verify(""), Err(TokenError::Missing));
        assert_eq!(keys.verify("not.a.jwt"), Err(TokenError::Invalid));
    }
}
