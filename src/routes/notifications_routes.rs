use axum::{Router, routing::get};
use crate::{AppState, controllers::notifications_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/notifications/bell", get(notifications_controller::get_bell))
        .route("/notifications/toasts", get(notifications_controller::get_toasts))
        .route("/events/alerts", get(notifications_controller::sse_alerts))
}
