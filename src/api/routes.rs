//! REST route handlers

use axum::extract::State;
use axum::http::header::{HeaderMap, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::Response;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use prost::Message;
use serde::{Deserialize, Serialize};

use super::encoding::{self, Body, BINARY_FORMAT_HEADER, BINARY_FORMAT_PROTOBUF};
use super::proto;
use super::server::AppState;
use crate::error::{Error, Result};
use crate::model::{LogRecord, User};
use crate::store::FoundUser;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordsQuery {
    pub time_from: Option<DateTime<Utc>>,
    pub time_to: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub records: Vec<LogRecord>,
    pub limited: bool,
}

// Auth routes

/// POST /api/auth/login - verify credentials and open a session
pub async fn login(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<Response> {
    let user_id = state
        .users
        .check_password(&creds.login, &creds.password)
        .await?;

    let mut session = state.sessions.issue();
    session.set_user_id(user_id);
    let cookie = state.sessions.cookie(&session)?;

    let mut response = encoding::respond(StatusCode::OK, Body::Empty);
    response.headers_mut().insert(SET_COOKIE, cookie);
    Ok(response)
}

/// DELETE /api/auth/close - drop the login from the session. Failing to
/// re-persist the cookie is logged, not surfaced: the logout still counts.
pub async fn close_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    let mut session = match state.sessions.load(&headers)? {
        Some(session) => session,
        None => state.sessions.issue(),
    };
    session.clear_user_id();

    let mut response = encoding::respond(StatusCode::OK, Body::Empty);
    match state.sessions.cookie(&session) {
        Ok(cookie) => {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        Err(e) => tracing::error!(error = %e, "session save error"),
    }
    Ok(response)
}

// Private routes (behind the authentication middleware)

/// GET /api/private/whoami - the user behind the current session
pub async fn whoami(Extension(current): Extension<FoundUser>) -> Result<Response> {
    let body = serde_json::to_value(current.user())?;
    Ok(encoding::respond(StatusCode::OK, Body::Json(body)))
}

/// POST /api/private/add-user - admin only
pub async fn add_user(
    State(state): State<AppState>,
    Extension(current): Extension<FoundUser>,
    Json(mut user): Json<User>,
) -> Result<Response> {
    if !current.is_reserved_admin() {
        return Err(Error::NotAdmin);
    }

    state.users.insert(&mut user).await?;
    Ok(encoding::respond(StatusCode::CREATED, Body::Empty))
}

/// GET /api/private/users - admin only
pub async fn get_users(
    State(state): State<AppState>,
    Extension(current): Extension<FoundUser>,
) -> Result<Response> {
    if !current.is_reserved_admin() {
        return Err(Error::NotAdmin);
    }

    let users = state.users.get_users().await?;
    let body = serde_json::to_value(users)?;
    Ok(encoding::respond(StatusCode::OK, Body::Json(body)))
}

/// PUT /api/private/change-password - self for everyone, anyone for admin
pub async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<FoundUser>,
    Json(creds): Json<Credentials>,
) -> Result<Response> {
    state
        .users
        .change_password(&current, &creds.login, &creds.password)
        .await?;
    Ok(encoding::respond(StatusCode::OK, Body::Empty))
}

/// POST /api/private/add-log - insert a batch of records
pub async fn add_log(
    State(state): State<AppState>,
    Json(records): Json<Vec<LogRecord>>,
) -> Result<Response> {
    state.logs.insert(&records).await?;
    Ok(encoding::respond(StatusCode::CREATED, Body::Empty))
}

/// GET /api/private/records - time-range query, encoded per the request
/// headers: protobuf when the binary-format header asks for it, otherwise
/// JSON through the negotiated compressor.
pub async fn records(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(query): Json<RecordsQuery>,
) -> Result<Response> {
    let limit = query
        .limit
        .unwrap_or(state.max_records)
        .min(state.max_records);

    let (records, limited) = state
        .logs
        .find(query.time_from, query.time_to, limit)
        .await?;

    if records.is_empty() {
        return Ok(encoding::respond(StatusCode::OK, Body::Empty));
    }

    let wants_protobuf = headers
        .get(BINARY_FORMAT_HEADER)
        .and_then(|v| v.to_str().ok())
        == Some(BINARY_FORMAT_PROTOBUF);

    if wants_protobuf {
        let message = proto::LogRecords::from_records(&records, limited);
        return Ok(encoding::respond_binary(
            StatusCode::OK,
            message.encode_to_vec(),
            true,
        ));
    }

    let body = serde_json::to_value(RecordsResponse { records, limited })?;
    Ok(encoding::respond_compressed(
        &headers,
        StatusCode::OK,
        Body::Json(body),
    ))
}
