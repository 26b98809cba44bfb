use anyhow::{Result, anyhow};
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{self, SaltString, rand_core::OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Two-stage password verifier.
///
/// Stage one keys an HMAC-SHA256 of the password with the server pepper and
/// base64-encodes the digest. Stage two runs Argon2id with a fresh salt over
/// that string and yields a PHC string for storage. A leaked database alone is
/// not enough to mount a dictionary attack without the pepper.
#[derive(Clone)]
pub struct PasswordScheme {
    pepper: Vec<u8>,
    argon2: Argon2<'static>,
}

impl PasswordScheme {
    /// `time_cost` is the Argon2 iteration count, `memory_kib` its memory cost.
    pub fn new(pepper: impl Into<Vec<u8>>, time_cost: u32, memory_kib: u32) -> Result<Self> {
        let pepper = pepper.into();
        if pepper.is_empty() {
            return Err(anyhow!("Password pepper must not be empty"));
        }

        let params = Params::new(memory_kib, time_cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| anyhow!("Invalid Argon2 parameters: {}", e))?;

        Ok(Self {
            pepper,
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Derive a storable verifier for `password`.
    pub fn hash(&self, password: &str) -> Result<String> {
        let pre_hashed = pre_hash(&self.pepper, password.as_bytes())?;
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(pre_hashed.as_bytes(), &salt)
            .map_err(|e| anyhow!("Password hashing failed: {}", e))?;

        Ok(hash.to_string())
    }

    /// Check `password` against a stored verifier. A mismatch is `Ok(false)`;
    /// errors are reserved for unparsable verifiers and hashing failures.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(stored).map_err(|e| anyhow!("Corrupt password verifier: {}", e))?;
        let pre_hashed = pre_hash(&self.pepper, password.as_bytes())?;

        // Cost parameters come from the PHC string, so verifiers created under
        // an older cost setting still check out.
        match self.argon2.verify_password(pre_hashed.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow!("Password verification failed: {}", e)),
        }
    }
}

/// Keyed pre-hash of the password, base64 encoded.
fn pre_hash(pepper: &[u8], password: &[u8]) -> Result<String> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(pepper)
        .map_err(|e| anyhow!("Invalid pepper key: {}", e))?;
    mac.update(password);
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}
