//! Web UI handlers
//!
//! Minimal server-rendered pages over the same use-case and session
//! interfaces the REST API uses: a log browser/search table, a login form
//! and placeholder stats/admin pages.

use axum::extract::{Query, State};
use axum::http::header::HeaderMap;
use axum::response::Html;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::middleware::resolve_user;
use crate::api::server::AppState;
use crate::store::FoundUser;

const BACKGROUND_COLOR: &str = "#111827";
const TABLE_COLOR: &str = "#1F2937";
const TABLE_HEADER_COLOR: &str = "#374151";

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SearchQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Dashboard and search page - lists log records for the current session
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    headers: HeaderMap,
) -> Html<String> {
    let Some(user) = current_user(&state, &headers).await else {
        return page(
            "Logs",
            "/",
            r#"<p class="p-4">Not signed in. <a class="underline" href="/login">Sign in</a> to browse logs.</p>"#
                .to_string(),
        );
    };

    let from = parse_time(query.from.as_deref());
    let to = parse_time(query.to.as_deref());

    let body = match state.logs.find(from, to, state.max_records).await {
        Ok((records, limited)) => {
            let rows: String = records
                .iter()
                .map(|r| {
                    format!(
                        "<tr style=\"background-color: {};\">\
                         <td class=\"px-3 py-1\">{}</td>\
                         <td class=\"px-3 py-1\">{}</td>\
                         <td class=\"px-3 py-1\">{}</td>\
                         <td class=\"px-3 py-1\">{}</td>\
                         <td class=\"px-3 py-1\">{}</td>\
                         <td class=\"px-3 py-1\">{}</td>\
                         </tr>",
                        TABLE_COLOR,
                        r.id,
                        r.log_time.map(|t| t.to_rfc3339()).unwrap_or_default(),
                        r.level,
                        escape(&r.message1),
                        escape(&r.message2),
                        escape(&r.message3),
                    )
                })
                .collect();

            let notice = if limited {
                "<p class=\"p-2\">Result truncated; narrow the time range.</p>"
            } else {
                ""
            };

            format!(
                "<p class=\"p-2\">Signed in as {}.</p>\
                 <form class=\"p-2\" method=\"get\" action=\"/search\">\
                 <label>From <input name=\"from\" value=\"{}\"></label>\
                 <label>To <input name=\"to\" value=\"{}\"></label>\
                 <button type=\"submit\">Search</button>\
                 </form>\
                 {}\
                 <table class=\"w-full text-sm\">\
                 <tr style=\"background-color: {};\">\
                 <th>ID</th><th>Time</th><th>Level</th>\
                 <th>Message</th><th>Detail</th><th>Extra</th>\
                 </tr>{}</table>",
                escape(user.login()),
                escape(query.from.as_deref().unwrap_or("")),
                escape(query.to.as_deref().unwrap_or("")),
                notice,
                TABLE_HEADER_COLOR,
                rows,
            )
        }
        Err(e) => format!("<p class=\"p-4\">Query failed: {}</p>", escape(&e.to_string())),
    };

    page("Logs", "/", body)
}

/// Login form posting to the REST login endpoint
pub async fn login_page() -> Html<String> {
    const LOGIN_BODY: &str = r#"<form class="p-4" onsubmit="signIn(); return false;">
  <label>Login <input id="login" type="text"></label>
  <label>Password <input id="password" type="password"></label>
  <button type="submit">Sign in</button>
  <button type="button" onclick="signOut()">Sign out</button>
</form>
<script>
function signIn() {
  fetch("/api/auth/login", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({
      login: document.getElementById("login").value,
      password: document.getElementById("password").value
    })
  }).then(() => location.assign("/"));
}
function signOut() {
  fetch("/api/auth/close", { method: "DELETE" }).then(() => location.reload());
}
</script>"#;

    page("Sign in", "/login", LOGIN_BODY.to_string())
}

/// Stats page placeholder
pub async fn stats() -> Html<String> {
    page("Stats", "/stats", "<p class=\"p-4\">Nothing here yet.</p>".to_string())
}

/// Administration page placeholder
pub async fn admin() -> Html<String> {
    page(
        "Administration",
        "/admin",
        "<p class=\"p-4\">User management is available through the REST API.</p>".to_string(),
    )
}

async fn current_user(state: &AppState, headers: &HeaderMap) -> Option<FoundUser> {
    let session = state.sessions.load(headers).ok()?;
    resolve_user(state, session).await.ok()
}

fn parse_time(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Shared page shell with the navbar
fn page(title: &str, active: &str, body: String) -> Html<String> {
    let nav: String = [
        ("/", "Browse"),
        ("/search", "Search"),
        ("/stats", "Stats"),
        ("/admin", "Administration"),
        ("/login", "Sign in"),
    ]
    .iter()
    .map(|(path, name)| {
        let marker = if *path == active { " • " } else { " " };
        format!("<a class=\"px-2\" href=\"{}\">{}{}</a>", path, marker, name)
    })
    .collect();

    Html(format!(
        "<!DOCTYPE html>\
         <html><head><title>{} - logserver</title></head>\
         <body style=\"background-color: {}; color: white; font-family: sans-serif;\">\
         <nav style=\"background-color: {}; padding: 8px;\">{}</nav>\
         {}\
         </body></html>",
        escape(title),
        BACKGROUND_COLOR,
        TABLE_HEADER_COLOR,
        nav,
        body,
    ))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
