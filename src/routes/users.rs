use axum::{middleware, routing::get, Router};

use crate::handlers::user::{delete_user, get_profile, get_user, list_users, update_profile, update_user};
use crate::middleware::auth::require_session;
use crate::middleware::roles::{require_role, ADMIN, ANY};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let own = Router::new()
        .route("/users/profile", get(get_profile).put(update_profile))
        .route_layer(middleware::from_fn_with_state(ANY, require_role));

    let admin = Router::new()
        .route("/users", get(list_users))
        .route("/admin/users/{id}", get(get_user).put(update_user).delete(delete_user))
        .route_layer(middleware::from_fn_with_state(ADMIN, require_role));

    own.merge(admin)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
}
