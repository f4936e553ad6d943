use crate::config::AuthConfig;
use crate::error::{Error, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Session,
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Session => "session",
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub purpose: TokenPurpose,
    /// Unique per issuance, so two tokens minted in the same second for the
    /// same subject still differ.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    session_ttl: Duration,
    verification_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            session_ttl: Duration::hours(config.session_ttl_hours),
            verification_ttl: Duration::hours(config.verification_ttl_hours),
            reset_ttl: Duration::hours(config.reset_ttl_hours),
        }
    }

    pub fn lifetime(&self, purpose: TokenPurpose) -> Duration {
        match purpose {
            TokenPurpose::Session => self.session_ttl,
            TokenPurpose::EmailVerification => self.verification_ttl,
            TokenPurpose::PasswordReset => self.reset_ttl,
        }
    }

    pub fn issue(&self, user_id: i64, purpose: TokenPurpose) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            purpose,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime(purpose)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str, expected: TokenPurpose) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| Error::Token("Invalid or expired token".to_string()))?;

        if data.claims.purpose != expected {
            return Err(Error::Token("Invalid or expired token".to_string()));
        }
        Ok(data.claims)
    }
}
