//! Builders wiring ledger engines into HTTP state.

use std::sync::Arc;

use shop_backend::domain::ports::LedgerStore;
use shop_backend::domain::{AccountFacade, CredentialVerifier, PurchaseEngine, TransferEngine};
use shop_backend::inbound::http::state::{HttpState, HttpStatePorts};

use super::ServerConfig;

/// Build handler state with every engine sharing `store`.
pub(crate) fn build_http_state<S>(store: Arc<S>, config: &ServerConfig) -> HttpState
where
    S: LedgerStore + 'static,
{
    let ports = HttpStatePorts {
        login: Arc::new(
            CredentialVerifier::new(Arc::clone(&store)).with_initial_grant(config.initial_grant),
        ),
        transfers: Arc::new(TransferEngine::new(Arc::clone(&store))),
        purchases: Arc::new(PurchaseEngine::new(Arc::clone(&store))),
        accounts: Arc::new(AccountFacade::new(store)),
    };
    HttpState::new(ports, Arc::clone(&config.tokens))
}
