//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::http::header::AUTHORIZATION;
use chrono::TimeDelta;

use crate::domain::LoginCredentials;
use crate::domain::ports::{
    MockAccountQuery, MockLoginService, MockPurchaseCommand, MockTransferCommand,
};
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::inbound::http::token::TokenIssuer;

/// Signing key shared by handler tests.
pub const TEST_SIGNING_KEY: &[u8] = b"handler-test-signing-key";

/// Build handler state backed by expectation-free mocks.
///
/// Any port the test does not replace in `configure` panics when called.
pub fn test_state(configure: impl FnOnce(&mut HttpStatePorts)) -> HttpState {
    let mut ports = HttpStatePorts {
        login: Arc::new(MockLoginService::new()),
        transfers: Arc::new(MockTransferCommand::new()),
        purchases: Arc::new(MockPurchaseCommand::new()),
        accounts: Arc::new(MockAccountQuery::new()),
    };
    configure(&mut ports);
    let tokens = TokenIssuer::new(
        TEST_SIGNING_KEY,
        TimeDelta::hours(1),
        Arc::new(mockable::DefaultClock),
    );
    HttpState::new(ports, Arc::new(tokens))
}

/// Issue a token for `username`/`secret` with the state's issuer.
pub fn token_for(state: &HttpState, username: &str, secret: &str) -> String {
    let credentials = LoginCredentials::try_from_parts(username, secret).expect("credentials");
    state.tokens.issue(&credentials).expect("token issued")
}

/// `Authorization` header carrying `token`.
pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {token}"))
}
