//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven port: [`LedgerStore`]. Driving ports: [`LoginService`],
//! [`TransferCommand`], [`PurchaseCommand`] and [`AccountQuery`].

mod macros;
pub(crate) use macros::define_port_error;

mod account_query;
mod ledger_store;
mod login_service;
mod purchase_command;
mod transfer_command;

pub use account_query::AccountQuery;
#[cfg(test)]
pub use account_query::MockAccountQuery;
pub use ledger_store::{LedgerStore, LedgerStoreError};
#[cfg(test)]
pub use ledger_store::MockLedgerStore;
pub use login_service::LoginService;
#[cfg(test)]
pub use login_service::MockLoginService;
#[cfg(test)]
pub use purchase_command::MockPurchaseCommand;
pub use purchase_command::PurchaseCommand;
#[cfg(test)]
pub use transfer_command::MockTransferCommand;
pub use transfer_command::TransferCommand;
