use axum::{middleware, routing::get, Router};

use crate::handlers::driver::{create_driver, delete_driver, get_driver, list_drivers, update_driver};
use crate::middleware::auth::require_session;
use crate::middleware::roles::{require_role, FLEET};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/drivers", get(list_drivers).post(create_driver))
        .route("/drivers/{id}", get(get_driver).put(update_driver).delete(delete_driver))
        .route_layer(middleware::from_fn_with_state(FLEET, require_role))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
}
