//! Argon2 credential hashes stored alongside each account.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`),
//! so the salt and cost parameters travel with the digest and verification
//! needs no other state.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// Failure raised while hashing a secret or decoding a stored hash.
pub use argon2::password_hash::Error as CredentialHashError;

/// Hash `secret` with a fresh random salt and return the PHC string.
///
/// # Examples
/// ```
/// use shop_backend::domain::credential_hash::{hash_secret, verify_secret};
///
/// let stored = hash_secret("hunter2").unwrap();
/// assert!(stored.starts_with("$argon2id$"));
/// assert_eq!(verify_secret("hunter2", &stored), Ok(true));
/// ```
pub fn hash_secret(secret: &str) -> Result<String, CredentialHashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// Check `secret` against a stored PHC string.
///
/// Returns `Ok(false)` on a mismatch and an error when `stored` is not a
/// usable hash.
pub fn verify_secret(secret: &str, stored: &str) -> Result<bool, CredentialHashError> {
    let parsed = PasswordHash::new(stored)?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn verify_accepts_matching_secret_only() {
        let stored = hash_secret("correct horse").expect("hash");
        assert_eq!(verify_secret("correct horse", &stored), Ok(true));
        assert_eq!(verify_secret("correct horse ", &stored), Ok(false));
        assert_eq!(verify_secret("wrong", &stored), Ok(false));
    }

    #[rstest]
    fn same_secret_gets_distinct_salts() {
        let first = hash_secret("pw").expect("first hash");
        let second = hash_secret("pw").expect("second hash");
        assert_ne!(first, second);
        assert!(!first.contains("pw"));
    }

    #[rstest]
    #[case("")]
    #[case("sha256$00$00")]
    #[case("$argon2id$v=19$m=19456,t=2,p=1$not*base64$AAAA")]
    #[case("$md5$abc$def")]
    fn unusable_hashes_are_errors(#[case] stored: &str) {
        assert!(verify_secret("pw", stored).is_err());
    }
}
