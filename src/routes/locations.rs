use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::location::{create_location, delete_location, get_location, list_locations, update_location};
use crate::middleware::auth::require_session;
use crate::middleware::roles::{require_role, ANY, FLEET};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let read = Router::new()
        .route("/locations", get(list_locations))
        .route("/locations/{id}", get(get_location))
        .route_layer(middleware::from_fn_with_state(ANY, require_role));

    let write = Router::new()
        .route("/locations", post(create_location))
        .route("/locations/{id}", put(update_location).delete(delete_location))
        .route_layer(middleware::from_fn_with_state(FLEET, require_role));

    read.merge(write)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
}
