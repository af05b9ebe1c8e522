//! Wallet and shop API handlers.
//!
//! ```text
//! POST /api/auth {"username":"alice","password":"hunter2"}
//! GET /api/info
//! POST /api/sendCoin {"toUser":"bob","amount":200}
//! GET /api/buy/t-shirt
//! ```
//!
//! Every endpoint except `/api/auth` expects `Authorization: Bearer <token>`.

use actix_web::error::JsonPayloadError;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::{
    AccountSnapshot, Coins, Error, ItemKind, LoginCredentials, LoginValidationError,
    UserValidationError, Username,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{AuthenticatedUser, BearerCredentials};
use crate::inbound::http::error::ErrorResponse;
use crate::inbound::http::state::HttpState;

/// Sign-in body for `POST /api/auth`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AuthRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "hunter2")]
    pub password: String,
}

impl TryFrom<AuthRequest> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(value: AuthRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.username, &value.password)
    }
}

/// Bearer token returned by `POST /api/auth`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

/// One inventory line in `GET /api/info`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct InventoryItem {
    #[serde(rename = "type")]
    #[schema(example = "t-shirt")]
    pub kind: String,
    pub quantity: i32,
}

/// Incoming transfer in the caller's history.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedCoins {
    pub from_user: String,
    pub amount: Coins,
}

/// Outgoing transfer in the caller's history.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SentCoins {
    pub to_user: String,
    pub amount: Coins,
}

/// Transfer history, oldest first.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CoinHistoryBody {
    pub received: Vec<ReceivedCoins>,
    pub sent: Vec<SentCoins>,
}

/// Account view returned by `GET /api/info`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub coins: Coins,
    pub inventory: Vec<InventoryItem>,
    pub coin_history: CoinHistoryBody,
}

impl From<AccountSnapshot> for InfoResponse {
    fn from(snapshot: AccountSnapshot) -> Self {
        let AccountSnapshot {
            balance,
            inventory,
            history,
        } = snapshot;
        Self {
            coins: balance,
            inventory: inventory
                .into_iter()
                .map(|entry| InventoryItem {
                    kind: entry.item.into(),
                    quantity: entry.quantity,
                })
                .collect(),
            coin_history: CoinHistoryBody {
                received: history
                    .received
                    .into_iter()
                    .map(|t| ReceivedCoins {
                        from_user: t.from_user.into(),
                        amount: t.amount,
                    })
                    .collect(),
                sent: history
                    .sent
                    .into_iter()
                    .map(|t| SentCoins {
                        to_user: t.to_user.into(),
                        amount: t.amount,
                    })
                    .collect(),
            },
        }
    }
}

/// Transfer body for `POST /api/sendCoin`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendCoinRequest {
    #[schema(example = "bob")]
    pub to_user: String,
    #[schema(example = 200)]
    pub amount: Coins,
}

/// JSON extractor settings that report malformed bodies as `invalid_request`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(json_error)
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    Error::invalid_request(format!("malformed request body: {err}")).into()
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::Username(inner) => map_username_error("username", inner),
        LoginValidationError::EmptySecret => Error::invalid_request("password must not be empty")
            .with_details(json!({ "field": "password", "code": "empty_password" })),
    }
}

fn map_username_error(field: &str, err: UserValidationError) -> Error {
    let code = match err {
        UserValidationError::EmptyUsername => "empty_username",
        UserValidationError::UsernameTooLong { .. } => "username_too_long",
    };
    Error::invalid_request(err.to_string()).with_details(json!({ "field": field, "code": code }))
}

/// Sign in, registering the account on first use, and return a bearer token.
#[utoipa::path(
    post,
    path = "/api/auth",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 503, description = "Ledger unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tags = ["shop"],
    operation_id = "auth",
    security([])
)]
#[post("/auth")]
pub async fn auth(
    state: web::Data<HttpState>,
    payload: web::Json<AuthRequest>,
) -> ApiResult<web::Json<AuthResponse>> {
    let credentials =
        LoginCredentials::try_from(payload.into_inner()).map_err(map_login_validation_error)?;
    state.login.identify(&credentials).await?;
    let token = state.tokens.issue(&credentials)?;
    Ok(web::Json(AuthResponse { token }))
}

/// Balance, inventory and transfer history of the caller.
#[utoipa::path(
    get,
    path = "/api/info",
    responses(
        (status = 200, description = "Account view", body = InfoResponse),
        (status = 401, description = "Unauthorised", body = ErrorResponse),
        (status = 503, description = "Ledger unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tags = ["shop"],
    operation_id = "info",
    security(("bearerAuth" = []))
)]
#[get("/info")]
pub async fn info(
    state: web::Data<HttpState>,
    credentials: BearerCredentials,
) -> ApiResult<web::Json<InfoResponse>> {
    let (_, snapshot) = state
        .accounts
        .resolve_and_snapshot(&credentials.into_inner())
        .await?;
    Ok(web::Json(snapshot.into()))
}

/// Send coins to another account.
#[utoipa::path(
    post,
    path = "/api/sendCoin",
    request_body = SendCoinRequest,
    responses(
        (status = 200, description = "Coins sent"),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorised", body = ErrorResponse),
        (status = 404, description = "Unknown receiver", body = ErrorResponse),
        (status = 422, description = "Insufficient funds", body = ErrorResponse),
        (status = 503, description = "Ledger unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tags = ["shop"],
    operation_id = "sendCoin",
    security(("bearerAuth" = []))
)]
#[post("/sendCoin")]
pub async fn send_coin(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<SendCoinRequest>,
) -> ApiResult<HttpResponse> {
    let SendCoinRequest { to_user, amount } = payload.into_inner();
    let receiver = Username::new(&to_user).map_err(|err| map_username_error("toUser", err))?;
    state
        .transfers
        .send_coins(user.identity(), &receiver, amount)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

/// Buy one unit of a catalog item.
#[utoipa::path(
    get,
    path = "/api/buy/{item}",
    params(("item" = String, Path, description = "Catalog item kind", example = "t-shirt")),
    responses(
        (status = 200, description = "Item bought"),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorised", body = ErrorResponse),
        (status = 404, description = "Unknown item", body = ErrorResponse),
        (status = 422, description = "Insufficient funds", body = ErrorResponse),
        (status = 503, description = "Ledger unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tags = ["shop"],
    operation_id = "buy",
    security(("bearerAuth" = []))
)]
#[get("/buy/{item}")]
pub async fn buy(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    item: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let item = ItemKind::new(item.into_inner())
        .map_err(|err| Error::invalid_request(err.to_string()))?;
    state.purchases.buy(user.identity(), &item).await?;
    Ok(HttpResponse::Ok().finish())
}

#[cfg(test)]
#[path = "shop_tests.rs"]
mod tests;
