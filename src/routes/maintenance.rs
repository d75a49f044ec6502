use axum::{middleware, routing::get, Router};

use crate::handlers::maintenance::{
    create_maintenance, delete_maintenance, get_maintenance, list_maintenance, update_maintenance,
};
use crate::middleware::auth::require_session;
use crate::middleware::roles::{require_role, FLEET};
use crate::state::AppState;

/// Truck ownership is checked per record inside the handlers.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/maintenance", get(list_maintenance).post(create_maintenance))
        .route(
            "/maintenance/{id}",
            get(get_maintenance).put(update_maintenance).delete(delete_maintenance),
        )
        .route_layer(middleware::from_fn_with_state(FLEET, require_role))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
}
