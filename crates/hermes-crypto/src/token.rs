use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode};
use thiserror::Error;
use tracing::debug;

use hermes_types::api::Claims;

/// The only algorithm tokens are signed or accepted with.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::ES256;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("missing bearer in header")]
    MissingBearer,
    #[error("unexpected signing method: {0:?}")]
    UnexpectedAlgorithm(Algorithm),
    #[error("token is not valid")]
    Invalid,
}

/// ES256 key pair plus token lifetime. Built once at startup.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    /// `private_pem` is a PKCS#8 P-256 key, `public_pem` the matching SPKI key.
    /// The pair is checked against each other before returning.
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8], ttl: Duration) -> Result<Self> {
        let encoding =
            EncodingKey::from_ec_pem(private_pem).context("Invalid JWT private key")?;
        let decoding = DecodingKey::from_ec_pem(public_pem).context("Invalid JWT public key")?;

        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.set_required_spec_claims(&["exp", "sub"]);

        let keys = Self {
            encoding,
            decoding,
            validation,
            ttl,
        };

        let probe = keys.issue(0)?;
        keys.verify(&probe)
            .map_err(|_| anyhow::anyhow!("JWT public key does not match the private key"))?;

        Ok(keys)
    }

    /// Issue a token whose subject is `user_id`.
    pub fn issue(&self, user_id: i64) -> Result<String> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.ttl)
            .context("Token lifetime overflows the clock")?;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: expires.timestamp() as usize,
        };

        let token = encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Validate a raw `Authorization` header value and return the user id.
    pub fn verify_header(&self, header: &str) -> Result<i64, TokenError> {
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(TokenError::MissingBearer)?;
        self.verify(token)
    }

    /// Validate a bare token and return the user id it was issued for.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        // Look at the declared algorithm before touching any key, so a token
        // re-signed with HS256 using the public key as secret never gets that far.
        let header = decode_header(token).map_err(|e| {
            debug!("Unreadable token header: {}", e);
            TokenError::Invalid
        })?;
        if header.alg != TOKEN_ALGORITHM {
            return Err(TokenError::UnexpectedAlgorithm(header.alg));
        }

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!("Token rejected: {}", e);
            TokenError::Invalid
        })?;

        data.claims.sub.parse::<i64>().map_err(|_| {
            debug!("Token subject is not a user id: {:?}", data.claims.sub);
            TokenError::Invalid
        })
    }
}
