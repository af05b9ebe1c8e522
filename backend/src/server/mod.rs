//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;

use state_builders::build_http_state;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use shop_backend::Trace;
#[cfg(debug_assertions)]
use shop_backend::doc::ApiDoc;
use shop_backend::domain::ports::LedgerStore;
use shop_backend::inbound::http::health::{HealthState, live, ready};
use shop_backend::inbound::http::shop::{auth, buy, info, json_config, send_coin};
use shop_backend::inbound::http::state::HttpState;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let api = web::scope("/api")
        .app_data(json_config())
        .service(auth)
        .service(info)
        .service(send_coin)
        .service(buy);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server over `store`.
///
/// The server is bound but not yet driven; await the returned [`Server`].
/// `health_state` is marked ready once the socket is bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server<S>(
    health_state: web::Data<HealthState>,
    store: Arc<S>,
    config: ServerConfig,
) -> std::io::Result<Server>
where
    S: LedgerStore + 'static,
{
    let http_state = web::Data::new(build_http_state(store, &config));
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || build_app(server_health_state.clone(), http_state.clone()))
        .disable_signals()
        .bind(config.bind_addr)?
        .run();

    health_state.mark_ready();
    Ok(server)
}
