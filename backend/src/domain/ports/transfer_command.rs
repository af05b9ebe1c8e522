//! Driving port for peer-to-peer coin transfers.

use async_trait::async_trait;

use crate::domain::{Coins, Error, UserIdentity, Username};

/// Domain use-case port for sending coins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransferCommand: Send + Sync {
    /// Move `amount` coins from `sender` to the account named `receiver`.
    async fn send_coins(
        &self,
        sender: &UserIdentity,
        receiver: &Username,
        amount: Coins,
    ) -> Result<(), Error>;
}
