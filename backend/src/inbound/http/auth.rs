//! Bearer authentication extractors.
//!
//! Keep handlers focused on request/response mapping: the extractors here
//! turn an `Authorization: Bearer <jwt>` header into credentials, and
//! optionally into an identity re-validated against storage.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::{LocalBoxFuture, Ready, ready};

use crate::domain::{Error, LoginCredentials, UserIdentity};
use crate::inbound::http::state::HttpState;

const BEARER_PREFIX: &str = "Bearer ";

/// Credentials carried by a verified bearer token.
///
/// Signature and expiry are checked; the secret is not. Pass the
/// credentials to a domain port to confirm them.
#[derive(Debug, Clone)]
pub struct BearerCredentials(pub LoginCredentials);

impl BearerCredentials {
    /// Unwrap the decoded credentials.
    pub fn into_inner(self) -> LoginCredentials {
        self.0
    }
}

fn state_of(req: &HttpRequest) -> Result<web::Data<HttpState>, Error> {
    req.app_data::<web::Data<HttpState>>()
        .cloned()
        .ok_or_else(|| Error::internal("HTTP state is not registered"))
}

fn bearer_token(req: &HttpRequest) -> Result<&str, Error> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| Error::unauthorized("missing bearer token"))?;
    let value = header
        .to_str()
        .map_err(|_| Error::unauthorized("invalid authorization header"))?;
    value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Error::unauthorized("missing bearer token"))
}

fn extract_credentials(req: &HttpRequest) -> Result<LoginCredentials, Error> {
    let state = state_of(req)?;
    let token = bearer_token(req)?;
    state.tokens.decode(token)
}

impl FromRequest for BearerCredentials {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            extract_credentials(req)
                .map(BearerCredentials)
                .map_err(actix_web::Error::from),
        )
    }
}

/// Caller whose bearer credentials matched the stored credential.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserIdentity);

impl AuthenticatedUser {
    /// Trusted identity of the caller.
    pub fn identity(&self) -> &UserIdentity {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let prepared = state_of(req).and_then(|state| Ok((state, extract_credentials(req)?)));
        Box::pin(async move {
            let (state, credentials) = prepared?;
            let identity = state.accounts.resolve(&credentials).await?;
            Ok::<_, actix_web::Error>(AuthenticatedUser(identity))
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::MockAccountQuery;
    use crate::domain::{UserId, Username};
    use crate::inbound::http::test_utils::{bearer, test_state, token_for};
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test};

    fn alice() -> UserIdentity {
        UserIdentity::new(UserId::new(7), Username::new("alice").expect("username"))
    }

    #[actix_web::test]
    async fn rejects_missing_or_malformed_tokens() {
        let state = test_state(|_| {});
        let app = test::init_service(App::new().app_data(web::Data::new(state)).route(
            "/",
            web::get().to(|_: BearerCredentials| async { HttpResponse::Ok().finish() }),
        ))
        .await;

        for header in [
            None,
            Some("Basic YWxpY2U6cHc="),
            Some("Bearer "),
            Some("Bearer not-a-jwt"),
        ] {
            let mut request = test::TestRequest::get().uri("/");
            if let Some(value) = header {
                request = request.insert_header((AUTHORIZATION, value));
            }
            let res = test::call_service(&app, request.to_request()).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "header {header:?}");
        }
    }

    #[actix_web::test]
    async fn bearer_credentials_decode_the_token() {
        let state = test_state(|_| {});
        let token = token_for(&state, "alice", "pw");
        let app = test::init_service(App::new().app_data(web::Data::new(state)).route(
            "/",
            web::get().to(|creds: BearerCredentials| async move {
                HttpResponse::Ok().body(creds.into_inner().username().to_string())
            }),
        ))
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/")
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, "alice");
    }

    #[actix_web::test]
    async fn authenticated_user_is_resolved_through_the_account_port() {
        let state = test_state(|ports| {
            let mut accounts = MockAccountQuery::new();
            accounts
                .expect_resolve()
                .withf(|creds| creds.username().as_ref() == "alice" && creds.secret() == "pw")
                .times(1)
                .returning(|_| Ok(alice()));
            ports.accounts = std::sync::Arc::new(accounts);
        });
        let token = token_for(&state, "alice", "pw");
        let app = test::init_service(App::new().app_data(web::Data::new(state)).route(
            "/",
            web::get().to(|user: AuthenticatedUser| async move {
                HttpResponse::Ok().body(user.identity().id().to_string())
            }),
        ))
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/")
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, "7");
    }

    #[actix_web::test]
    async fn stale_credentials_are_unauthorised() {
        let state = test_state(|ports| {
            let mut accounts = MockAccountQuery::new();
            accounts
                .expect_resolve()
                .returning(|_| Err(Error::unauthorized("invalid credentials")));
            ports.accounts = std::sync::Arc::new(accounts);
        });
        let token = token_for(&state, "alice", "old");
        let app = test::init_service(App::new().app_data(web::Data::new(state)).route(
            "/",
            web::get().to(|_: AuthenticatedUser| async { HttpResponse::Ok().finish() }),
        ))
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/")
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
