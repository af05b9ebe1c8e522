//! Authentication primitives such as login credentials.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before a handler talks to a port or service.

use zeroize::Zeroizing;

use super::user::{UserValidationError, Username};

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginValidationError {
    /// Username was missing, blank or too long.
    #[error(transparent)]
    Username(#[from] UserValidationError),
    /// Secret was blank.
    #[error("password must not be empty")]
    EmptySecret,
}

/// Validated login credentials used by the credential verifier.
///
/// ## Invariants
/// - `username` satisfies [`Username`] validation.
/// - `secret` is non-empty but retains caller-provided whitespace to avoid
///   surprising credential comparisons.
///
/// # Examples
/// ```
/// use shop_backend::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts("alice", "hunter2").unwrap();
/// assert_eq!(creds.username().as_ref(), "alice");
/// assert_eq!(creds.secret(), "hunter2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    username: Username,
    secret: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw username/secret inputs.
    pub fn try_from_parts(username: &str, secret: &str) -> Result<Self, LoginValidationError> {
        let username = Username::new(username)?;
        if secret.is_empty() {
            return Err(LoginValidationError::EmptySecret);
        }

        Ok(Self {
            username,
            secret: Zeroizing::new(secret.to_owned()),
        })
    }

    /// Username suitable for account lookups.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Secret provided by the caller.
    pub fn secret(&self) -> &str {
        self.secret.as_str()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "pw", LoginValidationError::Username(UserValidationError::EmptyUsername))]
    #[case("   ", "pw", LoginValidationError::Username(UserValidationError::EmptyUsername))]
    #[case("user", "", LoginValidationError::EmptySecret)]
    fn invalid_credentials(
        #[case] username: &str,
        #[case] secret: &str,
        #[case] expected: LoginValidationError,
    ) {
        let err = LoginCredentials::try_from_parts(username, secret)
            .expect_err("invalid inputs must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    #[case("  alice  ", "secret")]
    #[case("bob", " padded secret ")]
    fn valid_credentials_trim_username_only(#[case] username: &str, #[case] secret: &str) {
        let creds = LoginCredentials::try_from_parts(username, secret)
            .expect("valid inputs should succeed");
        assert_eq!(creds.username().as_ref(), username.trim());
        assert_eq!(creds.secret(), secret);
    }
}
