use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::invoice::{create_invoice, get_invoice, list_invoices, update_invoice};
use crate::middleware::auth::require_session;
use crate::middleware::roles::{require_role, ANY, BILLING};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let read = Router::new()
        .route("/invoices", get(list_invoices))
        .route("/invoices/{id}", get(get_invoice))
        .route_layer(middleware::from_fn_with_state(ANY, require_role));

    let billing = Router::new()
        .route("/invoices", post(create_invoice))
        .route("/invoices/{id}", put(update_invoice))
        .route_layer(middleware::from_fn_with_state(BILLING, require_role));

    read.merge(billing)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
}
