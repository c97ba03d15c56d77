use std::{convert::Infallible, time::Duration};

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
};

use crate::{
    models::SessionToken,
    render,
    services::subscription_manager::{AlertListener, ListenerEvent},
    templates::Hbs,
    AppState,
};

fn html_or_500(res: Result<String, String>) -> Response {
    match res {
        Ok(html) => (StatusCode::OK, Html(html)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Html(e)).into_response(),
    }
}

// GET /notifications/bell
pub async fn get_bell(
    State(state): State<AppState>,
    session: Option<Extension<SessionToken>>,
) -> Response {
    let (entries, link_state) = match &session {
        Some(Extension(s)) => (state.alerts.snapshot(s).await, state.alerts.state_of(s)),
        None => (Vec::new(), None),
    };

    html_or_500(render::render_bell(&state.hbs, &entries, link_state))
}

// GET /notifications/toasts
pub async fn get_toasts(
    State(state): State<AppState>,
    session: Option<Extension<SessionToken>>,
) -> Response {
    let entries = match &session {
        Some(Extension(s)) => state.alerts.snapshot(s).await,
        None => Vec::new(),
    };

    html_or_500(render::render_toasts(&state.hbs, &entries))
}

/// `None` when the toast cannot be rendered; the failure is logged and the
/// browser sees nothing.
fn toast_event(hbs: &Hbs, listener_event: ListenerEvent) -> Option<Event> {
    match listener_event {
        ListenerEvent::Notification(entry) => match render::render_toast(hbs, &entry) {
            Ok(html) => Some(
                Event::default()
                    .event("alertTriggered")
                    .data(html.replace('\r', "")),
            ),
            Err(e) => {
                tracing::error!(error = %e, alert_id = entry.alert_id, "toast render failed");
                None
            }
        },
        ListenerEvent::Ended(end) => Some(Event::default().event("linkStatus").data(end.label())),
    }
}

// GET /events/alerts  (SSE)
//
// The browser connection is one listener on the session's shared link. When
// the link ends, a final `linkStatus` event is sent and the response stays
// idle (keep-alives only) so EventSource does not reconnect in a loop.
pub async fn sse_alerts(
    State(state): State<AppState>,
    session: Option<Extension<SessionToken>>,
) -> Response {
    let Some(Extension(session)) = session else {
        return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
    };

    tracing::debug!(subject = %session.subject, "browser alert stream attached");
    let listener = state.alerts.subscribe(session);
    let hbs = state.hbs.clone();

    let stream = futures_util::stream::unfold(Some(listener), move |listener: Option<AlertListener>| {
        let hbs = hbs.clone();
        async move {
            let Some(mut listener) = listener else {
                return futures_util::future::pending().await;
            };

            loop {
                let next = listener.next().await;
                let ended = matches!(next, ListenerEvent::Ended(_));
                let Some(event) = toast_event(&hbs, next) else { continue };

                let keep = if ended { None } else { Some(listener) };
                return Some((Ok::<_, Infallible>(event), keep));
            }
        }
    });

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(20))
                .text("keep-alive"),
        )
        .into_response()
}
