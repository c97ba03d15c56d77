use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    services::session::{CookieSessionProvider, SessionProvider},
    AppState,
};

pub fn session_cookie(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name).map(|c| c.value().to_string())
}

/// Resolves the auth provider's session cookie into a `SessionToken` request
/// extension and reports new sign-ins. Invalid or expired cookies leave the
/// request anonymous.
pub async fn inject_current_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let raw = session_cookie(&jar, &state.settings.session_cookie_name);

    let provider = CookieSessionProvider::new(raw, &state.settings.jwt_secret);
    if let Some(session) = provider.current_session().await {
        state.auth_events.observe(&session);
        req.extensions_mut().insert(session);
    }

    next.run(req).await
}
