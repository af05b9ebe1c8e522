//! Account identity primitives.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation errors returned by [`Username::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// Username was missing or blank once trimmed.
    #[error("username must not be empty")]
    EmptyUsername,
    /// Username exceeds the storage column width.
    #[error("username must be at most {max} characters")]
    UsernameTooLong {
        /// Maximum permitted length in characters.
        max: usize,
    },
}

/// Maximum username length, matching the `users.username` column.
pub const USERNAME_MAX: usize = 64;

/// Opaque numeric account identifier assigned by the ledger store.
///
/// Ordering is significant: transfers lock account rows in ascending
/// [`UserId`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw store identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw identifier as stored.
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique login name.
///
/// ## Invariants
/// - Trimmed and non-empty.
/// - At most [`USERNAME_MAX`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a [`Username`].
    ///
    /// # Examples
    /// ```
    /// use shop_backend::domain::Username;
    ///
    /// let name = Username::new("  alice ").unwrap();
    /// assert_eq!(name.as_ref(), "alice");
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if trimmed.chars().count() > USERNAME_MAX {
            return Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Trusted caller identity produced by the credential verifier.
///
/// Only the verifier constructs identities from unverified input; holding
/// one means the secret was checked against storage during this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    id: UserId,
    username: Username,
}

impl UserIdentity {
    /// Bind an identifier to its username.
    pub fn new(id: UserId, username: Username) -> Self {
        Self { id, username }
    }

    /// Store identifier of the account.
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Login name of the account.
    pub fn username(&self) -> &Username {
        &self.username
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", UserValidationError::EmptyUsername)]
    #[case("   ", UserValidationError::EmptyUsername)]
    fn blank_usernames_are_rejected(#[case] raw: &str, #[case] expected: UserValidationError) {
        assert_eq!(Username::new(raw), Err(expected));
    }

    #[rstest]
    fn overlong_usernames_are_rejected() {
        let raw = "x".repeat(USERNAME_MAX + 1);
        assert_eq!(
            Username::new(raw),
            Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX })
        );
    }

    #[rstest]
    fn usernames_are_trimmed() {
        let name = Username::new("\tbob ").expect("valid username");
        assert_eq!(name.as_ref(), "bob");
    }

    #[rstest]
    fn user_ids_order_numerically() {
        let mut ids = vec![UserId::new(10), UserId::new(2), UserId::new(7)];
        ids.sort();
        assert_eq!(ids, vec![UserId::new(2), UserId::new(7), UserId::new(10)]);
    }

    #[rstest]
    fn username_deserialization_validates() {
        let err = serde_json::from_str::<Username>("\"  \"");
        assert!(err.is_err());
    }
}
