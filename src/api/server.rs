//! HTTP API server

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::{middleware as axum_middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

use super::session::SessionStore;
use super::{middleware, routes};
use crate::config::Config;
use crate::error::Result;
use crate::store::{LogStore, UserStore};
use crate::ui;
use crate::usecase::{LogUsecase, UserUsecase};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: UserUsecase,
    pub logs: LogUsecase,
    pub sessions: SessionStore,
    pub max_records: u64,
}

impl AppState {
    pub fn new(config: &Config, users: Arc<dyn UserStore>, logs: Arc<dyn LogStore>) -> Self {
        Self {
            users: UserUsecase::new(users),
            logs: LogUsecase::new(logs),
            sessions: SessionStore::new(&config.session.key, config.session.max_age_secs),
            max_records: config.logs.max_records,
        }
    }
}

/// Run the HTTP server until interrupted; in-flight requests drain before
/// the listener closes.
pub async fn run_server(config: &Config, state: AppState) -> Result<()> {
    let app = create_router(state, Duration::from_secs(config.server.request_timeout_secs));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("logserver listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down");

    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let private = Router::new()
        .route("/whoami", get(routes::whoami))
        .route("/add-user", post(routes::add_user))
        .route("/change-password", put(routes::change_password))
        .route("/users", get(routes::get_users))
        .route("/add-log", post(routes::add_log))
        .route("/records", get(routes::records))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ));

    Router::new()
        // REST routes
        .route("/api/auth/login", post(routes::login))
        .route("/api/auth/close", delete(routes::close_session))
        .nest("/api/private", private)
        // UI routes
        .route("/", get(ui::index))
        .route("/search", get(ui::index))
        .route("/login", get(ui::login_page))
        .route("/stats", get(ui::stats))
        .route("/admin", get(ui::admin))
        // Middleware
        .layer(axum_middleware::from_fn(middleware::log_request))
        .layer(axum_middleware::from_fn(middleware::set_request_id))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
