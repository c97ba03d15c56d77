use axum::{Router, routing::post};
use crate::{AppState, controllers::auth_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/logout", post(auth_controller::logout))
}
