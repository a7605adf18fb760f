use crate::{
    auth::{
        router as auth_router,
        user::{AuthSession, Backend},
    },
    routes::{admin, api, dashboard::dashboard, events::open_events, me, registrations, review},
    services::{extraction::VisionClient, storage::Storage},
    util::rate_limit::RateLimiter,
};
use axum::{
    Router,
    response::{IntoResponse, Redirect},
    routing::{get, post, put},
};
use axum_login::{
    AuthManagerLayerBuilder,
    tower_sessions::{
        Expiry, SessionManagerLayer,
        cookie::{SameSite, time},
    },
};
use oauth2::{EndpointNotSet, EndpointSet, basic::BasicClient};
use sea_orm::DatabaseConnection;
use tokio::{signal, task::AbortHandle};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions_sqlx_store::PostgresStore;

pub type OauthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Storage,
    pub vision: VisionClient,
    pub limiter: RateLimiter,
}

pub fn create_router(
    state: AppState,
    backend: Backend,
    session_store: PostgresStore,
    secure_cookies: bool,
) -> Router {
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(SameSite::Lax) // Ensure we send the cookie from the OAuth redirect.
        .with_expiry(Expiry::OnInactivity(time::Duration::days(1)));

    // Auth service.
    //
    // This combines the session layer with our backend to establish the auth
    // service which will provide the auth session as a request extension.
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    Router::new()
        .route("/", get(index))
        .route("/me", get(me::me))
        .route("/me/church", post(me::complete_profile))
        .route("/dashboard", get(dashboard))
        .route("/events/open", get(open_events))
        .route(
            "/registrations",
            get(registrations::list).post(registrations::create),
        )
        .route(
            "/registrations/{id}",
            get(registrations::show).delete(registrations::cancel),
        )
        .route("/registrations/{id}/batches", post(registrations::add_batch))
        .route(
            "/registrations/{id}/batches/{batch_id}",
            put(registrations::edit_registration),
        )
        .route("/batches/{id}", put(registrations::edit_batch))
        .route("/review/queue", get(review::queue))
        .route("/review/batches/{id}/approve", post(review::approve))
        .route("/review/batches/{id}/reject", post(review::reject))
        .route("/review/export.csv", get(review::export_csv))
        .route("/api/extract", post(api::extract))
        .route("/api/uploads/{folder}", post(api::upload))
        .nest("/admin", admin::router())
        .merge(auth_router::router())
        .with_state(state)
        .layer(auth_layer)
        .layer(CorsLayer::new())
        .layer(TraceLayer::new_for_http())
}

async fn index(auth_session: AuthSession) -> impl IntoResponse {
    if auth_session.user.is_some() {
        Redirect::to("/dashboard").into_response()
    } else {
        Redirect::to("/login").into_response()
    }
}

pub async fn shutdown_signal(deletion_task_abort_handle: AbortHandle) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { deletion_task_abort_handle.abort() },
        _ = terminate => { deletion_task_abort_handle.abort() },
    }
    tracing::info!("shutting down");
}
