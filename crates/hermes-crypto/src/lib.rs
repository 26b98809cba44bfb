/// Hermes Crypto Library
///
/// Server-side secrets handling:
/// - `password`: peppered password verifiers (HMAC-SHA256, then Argon2id)
/// - `token`: ES256 access tokens carrying the user id

pub mod password;
pub mod token;

pub use password::PasswordScheme;
pub use token::{TokenError, TokenKeys};
