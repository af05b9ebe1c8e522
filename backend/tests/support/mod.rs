//! Shared helpers for integration tests that need a real PostgreSQL.
//!
//! Integration tests compile as separate crates, so suites pull these in with
//! `mod support;`.

pub mod cluster_skip;
pub mod pg_embed;

pub use cluster_skip::handle_cluster_setup_failure;
pub use pg_embed::{create_database, test_cluster};
