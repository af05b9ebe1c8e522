//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the wallet and shop endpoints, their request and
//! response bodies, the shared error body and the bearer token scheme. The
//! document is served by Swagger UI in debug builds and exported with
//! `cargo run --bin openapi-dump`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::ErrorCode;
use crate::inbound::http::ErrorResponse;
use crate::inbound::http::shop::{
    AuthRequest, AuthResponse, CoinHistoryBody, InfoResponse, InventoryItem, ReceivedCoins,
    SendCoinRequest, SentCoins,
};

/// Enrich the generated document with the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Token issued by POST /api/auth."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Coin shop API",
        description = "Wallet, transfer and merchandise endpoints backed by a transactional ledger."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("bearerAuth" = [])),
    paths(
        crate::inbound::http::shop::auth,
        crate::inbound::http::shop::info,
        crate::inbound::http::shop::send_coin,
        crate::inbound::http::shop::buy,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorResponse,
        ErrorCode,
        AuthRequest,
        AuthResponse,
        InfoResponse,
        InventoryItem,
        CoinHistoryBody,
        ReceivedCoins,
        SentCoins,
        SendCoinRequest,
    )),
    tags(
        (name = "shop", description = "Wallet, transfer and purchase operations"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
