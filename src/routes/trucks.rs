use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use crate::handlers::truck::{create_truck, delete_truck, get_truck, list_trucks, update_truck};
use crate::middleware::auth::require_session;
use crate::middleware::roles::{require_role, ADMIN, FLEET};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let fleet = Router::new()
        .route("/trucks", get(list_trucks).post(create_truck))
        .route("/trucks/{id}", get(get_truck))
        .route_layer(middleware::from_fn_with_state(FLEET, require_role));

    let admin = Router::new()
        .route("/trucks/{id}", put(update_truck).delete(delete_truck))
        .route_layer(middleware::from_fn_with_state(ADMIN, require_role));

    fleet
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
}
