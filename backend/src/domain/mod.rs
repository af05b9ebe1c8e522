//! Domain primitives, engines and ports.
//!
//! Purpose: keep ledger rules transport and storage agnostic. Engines depend
//! only on the [`ports::LedgerStore`] trait and return typed errors that
//! convert into the shared [`Error`] payload.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - CredentialVerifier, TransferEngine, PurchaseEngine, AccountFacade: the
//!   ledger use-cases, each implementing one driving port.
//! - Ledger value types such as AccountSnapshot and ItemKind.

pub mod account_facade;
pub mod auth;
pub mod credential_hash;
pub mod credential_verifier;
pub mod error;
pub mod ledger;
pub mod ports;
pub mod purchase_engine;
pub mod transfer_engine;
pub mod user;

pub use self::account_facade::{AccountFacade, SnapshotError};
pub use self::auth::{LoginCredentials, LoginValidationError};
pub use self::credential_hash::CredentialHashError;
pub use self::credential_verifier::{CredentialVerifier, IdentifyError, Identification};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::ledger::{
    AccountSnapshot, CoinHistory, Coins, DEFAULT_INITIAL_GRANT, InventoryEntry, ItemId, ItemKind,
    ItemKindValidationError, PurchaseQuote, ReceivedTransfer, SEEDED_CATALOG, SentTransfer,
    SnapshotPart, StoredCredential, UserCreation,
};
pub use self::purchase_engine::{PurchaseEngine, PurchaseError};
pub use self::transfer_engine::{TransferEngine, TransferError};
pub use self::user::{USERNAME_MAX, UserId, UserIdentity, UserValidationError, Username};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use shop_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::unauthorized("missing token"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
