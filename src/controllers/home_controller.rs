use axum::{
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

use crate::{models::SessionToken, render, AppState};

fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn page(
    state: &AppState,
    headers: &HeaderMap,
    status: StatusCode,
    tpl: &str,
    title: &str,
    session: Option<&SessionToken>,
) -> Response {
    let ctx = json!({ "is_logged_in": session.is_some() });
    let body = match state.hbs.render(tpl, &ctx) {
        Ok(s) => s,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("template error: {e}")),
            )
                .into_response();
        }
    };

    if is_htmx(headers) {
        return (status, Html(body)).into_response();
    }

    match render::render_full(&state.hbs, title, body, session) {
        Ok(page) => (status, Html(page)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Html(e)).into_response(),
    }
}

pub async fn home(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Option<Extension<SessionToken>>,
) -> Response {
    let session = session.as_ref().map(|Extension(s)| s);
    page(&state, &headers, StatusCode::OK, "pages/home", "Alerts", session)
}

pub async fn not_found(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Option<Extension<SessionToken>>,
) -> Response {
    let session = session.as_ref().map(|Extension(s)| s);
    page(&state, &headers, StatusCode::NOT_FOUND, "pages/not_found", "404", session)
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Html("ok".to_string()))
}
