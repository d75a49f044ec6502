use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::handlers::shipment::{create_shipment, delete_shipment, get_shipment, list_shipments, update_shipment};
use crate::handlers::tracking::{add_tracking, get_tracking};
use crate::middleware::auth::require_session;
use crate::middleware::roles::{require_role, ANY, SHIPPERS};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    // Party access to a single shipment is decided inside the handlers.
    let shared = Router::new()
        .route("/shipments", get(list_shipments))
        .route("/shipments/{id}", get(get_shipment).put(update_shipment))
        .route("/shipments/{id}/tracking", get(get_tracking).post(add_tracking))
        .route_layer(middleware::from_fn_with_state(ANY, require_role));

    let shippers = Router::new()
        .route("/shipments", post(create_shipment))
        .route("/shipments/{id}", delete(delete_shipment))
        .route_layer(middleware::from_fn_with_state(SHIPPERS, require_role));

    shared
        .merge(shippers)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
}
