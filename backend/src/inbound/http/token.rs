//! Bearer token issuance and decoding.
//!
//! Tokens are HS256 JWTs carrying the login credentials and an expiry. A
//! decoded token is never trusted on its own: handlers hand the credentials
//! back to the domain, which re-checks them against storage on every call.

use std::sync::Arc;

use chrono::TimeDelta;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::{Error, LoginCredentials};

#[derive(Serialize, Deserialize)]
struct Claims {
    username: String,
    secret: String,
    exp: i64,
}

/// Signs and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    /// Create an issuer signing with `signing_key`.
    ///
    /// Issue and expiry times come from `clock`.
    pub fn new(signing_key: &[u8], ttl: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(signing_key),
            decoding: DecodingKey::from_secret(signing_key),
            ttl,
            clock,
        }
    }

    /// Sign a token for `credentials`.
    pub fn issue(&self, credentials: &LoginCredentials) -> Result<String, Error> {
        let exp = (self.clock.utc() + self.ttl).timestamp();
        let claims = Claims {
            username: credentials.username().to_string(),
            secret: credentials.secret().to_owned(),
            exp,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| Error::internal(format!("failed to sign token: {err}")));
        drop(Zeroizing::new(claims.secret));
        token
    }

    /// Verify signature and expiry, returning the embedded credentials.
    ///
    /// # Errors
    /// [`crate::domain::ErrorCode::Unauthorized`] for any malformed, forged
    /// or expired token.
    pub fn decode(&self, token: &str) -> Result<LoginCredentials, Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock below.
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|err| {
            debug!(error = %err, "rejected bearer token");
            Error::unauthorized("invalid token")
        })?;
        let Claims {
            username,
            secret,
            exp,
        } = data.claims;
        let secret = Zeroizing::new(secret);
        if exp <= self.clock.utc().timestamp() {
            return Err(Error::unauthorized("token expired"));
        }
        LoginCredentials::try_from_parts(&username, &secret)
            .map_err(|_| Error::unauthorized("invalid token"))
    }
}
