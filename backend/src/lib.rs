//! Coin wallet and shop backend.
//!
//! The domain layer holds the ledger rules and talks to storage through the
//! [`domain::ports::LedgerStore`] port. Inbound HTTP handlers and outbound
//! storage adapters sit at the edges.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
/// Request tracing middleware.
pub use middleware::Trace;
