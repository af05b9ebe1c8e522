//! HTTP server configuration object.

use std::net::SocketAddr;
use std::sync::Arc;

use shop_backend::domain::{Coins, DEFAULT_INITIAL_GRANT};
use shop_backend::inbound::http::token::TokenIssuer;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) tokens: Arc<TokenIssuer>,
    pub(crate) initial_grant: Coins,
}

impl ServerConfig {
    /// Construct a configuration binding `bind_addr` and signing with `tokens`.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, tokens: TokenIssuer) -> Self {
        Self {
            bind_addr,
            tokens: Arc::new(tokens),
            initial_grant: DEFAULT_INITIAL_GRANT,
        }
    }

    /// Override the balance granted to newly registered accounts.
    #[must_use]
    pub fn with_initial_grant(mut self, initial_grant: Coins) -> Self {
        self.initial_grant = initial_grant;
        self
    }
}
