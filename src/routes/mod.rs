pub mod auth;
pub mod drivers;
pub mod invoices;
pub mod locations;
pub mod maintenance;
pub mod route_plans;
pub mod shipments;
pub mod transactions;
pub mod trucks;
pub mod users;

use axum::Router;
use crate::state::AppState;

pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes(state))
        .merge(trucks::routes(state))
        .merge(drivers::routes(state))
        .merge(locations::routes(state))
        .merge(shipments::routes(state))
        .merge(route_plans::routes(state))
        .merge(maintenance::routes(state))
        .merge(invoices::routes(state))
        .merge(transactions::routes(state))
}
