mod auth;
mod config;
mod database;
mod directory;
mod entities;
mod error;
mod router;
mod routes;
mod services;
#[cfg(test)]
mod test_support;
mod util;
mod workflow;

use auth::user::Backend;
use axum_login::tower_sessions::ExpiredDeletion;
use config::Config;
use database::setup_database;
use oauth2::basic::BasicClient;
use router::{AppState, create_router, shutdown_signal};
use services::{extraction::VisionClient, storage::Storage};
use tokio::net::TcpListener;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use util::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (db, pool) = setup_database(&config.database_url).await?;

    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    let deletion_task = tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(tokio::time::Duration::from_secs(60)),
    );

    let client = BasicClient::new(config.client_id.clone())
        .set_client_secret(config.client_secret.clone())
        .set_auth_uri(config.auth_url.clone())
        .set_token_uri(config.token_url.clone())
        .set_redirect_uri(config.redirect_url.clone());

    let backend = Backend::new(
        db.clone(),
        client,
        config.userinfo_url.clone(),
        config.admin_emails.clone(),
    )?;

    let state = AppState {
        db,
        storage: Storage::new(
            config.storage_url.clone(),
            config.storage_bucket.clone(),
            config.storage_key.clone(),
        ),
        vision: VisionClient::new(
            config.vision_api_url.clone(),
            config.vision_api_key.clone(),
            config.vision_model.clone(),
        ),
        limiter: RateLimiter::connect(config.redis_url.as_deref(), config.rate_limit_per_minute)
            .await?,
    };

    let app = create_router(state, backend, session_store, config.secure_cookies());

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(deletion_task.abort_handle()))
        .await?;

    match deletion_task.await {
        Ok(result) => result?,
        Err(e) if e.is_cancelled() => {}
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
