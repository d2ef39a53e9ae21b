//! Session authentication.
//!
//! The signed-in user is carried in an HS256 JWT in the `starsling_session`
//! HttpOnly cookie.

mod extractor;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

pub use extractor::{AuthError, SessionUser};

use crate::error::{AppError, AppResult};
use crate::models::user::SessionClaims;

/// Session JWT issuer.
pub const SESSION_ISSUER: &str = "starsling";

/// Key used to sign and verify session tokens.
///
/// `Debug` prints `[REDACTED]`; the secret is only reachable through
/// `expose_secret()` inside this module.
#[derive(Clone)]
pub struct SessionKey {
    secret: SecretString,
    ttl_secs: u64,
}

impl SessionKey {
    pub fn new(secret: SecretString, ttl_secs: u64) -> Self {
        Self { secret, ttl_secs }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Sign a session token for `user_id`.
    pub fn issue(&self, user_id: Uuid, username: &str) -> AppResult<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::seconds(self.ttl_secs as i64);

        let claims = SessionClaims {
            sub: user_id.to_string(),
            iss: SESSION_ISSUER.to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
            username: username.to_string(),
        };

        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        encode(&Header::default(), &claims, &key)
            .map_err(|e| AppError::Internal(format!("Failed to create session token: {}", e)))
    }

    /// Verify a session token and return its claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, String> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[SESSION_ISSUER]);
        validation.validate_aud = false;

        let token_data = decode::<SessionClaims>(token, &key, &validation)
            .map_err(|e| format!("Invalid session token: {}", e))?;

        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey([REDACTED])")
    }
}
