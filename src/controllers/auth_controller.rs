use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::{models::SessionToken, services::session::AuthStateChange, AppState};

// POST /logout
//
// Login happens at the auth provider; signing out here drops the provider's
// cookie and tells every alert link bound to the session to shut down.
pub async fn logout(
    State(state): State<AppState>,
    session: Option<Extension<SessionToken>>,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(Extension(session)) = session {
        tracing::info!(subject = %session.subject, "signing out");
        state
            .auth_events
            .publish(AuthStateChange::SignedOut(session.bearer));
    }

    let removal = Cookie::build((state.settings.session_cookie_name.clone(), "")).path("/");
    let jar = jar.remove(removal);
    (jar, (StatusCode::SEE_OTHER, [("Location", "/")]))
}
