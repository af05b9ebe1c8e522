//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{AccountQuery, LoginService, PurchaseCommand, TransferCommand};
use crate::inbound::http::token::TokenIssuer;

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub login: Arc<dyn LoginService>,
    pub transfers: Arc<dyn TransferCommand>,
    pub purchases: Arc<dyn PurchaseCommand>,
    pub accounts: Arc<dyn AccountQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub login: Arc<dyn LoginService>,
    pub transfers: Arc<dyn TransferCommand>,
    pub purchases: Arc<dyn PurchaseCommand>,
    pub accounts: Arc<dyn AccountQuery>,
    pub tokens: Arc<TokenIssuer>,
}

impl HttpState {
    /// Construct state from the port bundle and a token issuer.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use chrono::TimeDelta;
    /// use shop_backend::domain::{AccountFacade, CredentialVerifier, PurchaseEngine, TransferEngine};
    /// use shop_backend::inbound::http::state::{HttpState, HttpStatePorts};
    /// use shop_backend::inbound::http::token::TokenIssuer;
    /// use shop_backend::outbound::memory::InMemoryLedgerStore;
    ///
    /// let store = Arc::new(InMemoryLedgerStore::new());
    /// let ports = HttpStatePorts {
    ///     login: Arc::new(CredentialVerifier::new(store.clone())),
    ///     transfers: Arc::new(TransferEngine::new(store.clone())),
    ///     purchases: Arc::new(PurchaseEngine::new(store.clone())),
    ///     accounts: Arc::new(AccountFacade::new(store)),
    /// };
    /// let tokens = TokenIssuer::new(b"dev-key", TimeDelta::hours(24), Arc::new(mockable::DefaultClock));
    /// let _state = HttpState::new(ports, Arc::new(tokens));
    /// ```
    pub fn new(ports: HttpStatePorts, tokens: Arc<TokenIssuer>) -> Self {
        let HttpStatePorts {
            login,
            transfers,
            purchases,
            accounts,
        } = ports;
        Self {
            login,
            transfers,
            purchases,
            accounts,
            tokens,
        }
    }
}
