use axum::{middleware, routing::get, Router};

use crate::handlers::route::{create_route, get_route, list_routes, update_route};
use crate::middleware::auth::require_session;
use crate::middleware::roles::{require_role, FLEET};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/routes", get(list_routes).post(create_route))
        .route("/routes/{id}", get(get_route).put(update_route))
        .route_layer(middleware::from_fn_with_state(FLEET, require_role))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
}
