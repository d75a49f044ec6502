use axum::{middleware, routing::get, Router};

use crate::handlers::transaction::{create_transaction, list_transactions};
use crate::middleware::auth::require_session;
use crate::middleware::roles::{require_role, SHIPPERS};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route_layer(middleware::from_fn_with_state(SHIPPERS, require_role))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
}
