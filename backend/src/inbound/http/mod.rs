//! HTTP inbound adapter exposing REST endpoints.

pub mod auth;
pub mod error;
pub mod health;
pub mod shop;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod token;

pub use error::{ApiResult, ErrorResponse};
