//! Backend entry-point: loads settings, migrates the ledger schema and serves
//! the wallet API.

mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use shop_backend::inbound::http::health::HealthState;
use shop_backend::inbound::http::token::TokenIssuer;
use shop_backend::outbound::persistence::{
    DbPool, DieselLedgerStore, PoolConfig, apply_migrations_async,
};
use shop_backend::settings::LedgerSettings;

use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings =
        LedgerSettings::load().map_err(|err| eyre!("failed to load settings: {err}"))?;
    let database_url = settings.database_url()?.to_owned();
    let bind_addr: SocketAddr = settings
        .bind_addr()
        .parse()
        .wrap_err_with(|| format!("invalid bind address {}", settings.bind_addr()))?;
    let signing_key = settings.signing_key()?;
    let tokens = TokenIssuer::new(
        &signing_key,
        settings.token_ttl(),
        Arc::new(mockable::DefaultClock),
    );
    drop(signing_key);

    let applied = apply_migrations_async(database_url.clone()).await?;
    info!(applied, "ledger schema up to date");

    let pool = DbPool::new(
        PoolConfig::new(database_url).with_max_size(settings.pool_max_size()),
    )
    .await?;
    let store = Arc::new(DieselLedgerStore::new(pool).with_deadline(settings.store_deadline()));

    let config = ServerConfig::new(bind_addr, tokens).with_initial_grant(settings.initial_grant()?);
    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), store, config)?;
    info!(%bind_addr, "listening");

    let handle = server.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            health_state.mark_draining();
            handle.stop(true).await;
        }
    });

    server.await.wrap_err("server terminated with an error")
}
