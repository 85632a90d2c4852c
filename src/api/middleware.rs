//! Request middleware: request IDs, request logging, authentication

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use super::server::AppState;
use super::session::Session;
use crate::error::{Error, Result};
use crate::store::FoundUser;

/// Request ID attached to every request and echoed in `X-Request-ID`
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub async fn set_request_id(mut req: Request, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-request-id"), value);
    }
    response
}

/// Log every request on entry and completion, escalating the level with
/// the response status class.
pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    tracing::info!(%method, %uri, %request_id, "started");

    let start = Instant::now();
    let response = next.run(req).await;
    let status = response.status();
    let elapsed = start.elapsed();

    if status.is_server_error() {
        tracing::error!(%method, %uri, %request_id, status = status.as_u16(), ?elapsed, "completed");
    } else if status.is_client_error() {
        tracing::warn!(%method, %uri, %request_id, status = status.as_u16(), ?elapsed, "completed");
    } else {
        tracing::info!(%method, %uri, %request_id, status = status.as_u16(), ?elapsed, "completed");
    }

    response
}

/// Resolve the session cookie into an authenticated user and attach it to
/// the request. Everything under /api/private runs behind this.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let session = state.sessions.load(req.headers())?;
    let user = resolve_user(&state, session).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// The per-request authentication state machine: a malformed cookie has
/// already failed in `load`; missing session data is 401, a lookup error
/// 500, a vanished user 404.
pub(crate) async fn resolve_user(
    state: &AppState,
    session: Option<Session>,
) -> Result<FoundUser> {
    let Some(session) = session else {
        return Err(Error::NotAuthenticated);
    };
    let Some(user_id) = session.user_id() else {
        return Err(Error::NotAuthenticated);
    };
    if session.max_age() < 0 {
        return Err(Error::NotAuthenticated);
    }

    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(Error::UserNotFound)
}
