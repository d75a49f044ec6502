use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::auth::AuthContext;
use crate::error::AppError;
use crate::models::user::Role;

pub const ANY: &[Role] = Role::ALL;
/// User administration and truck edits.
pub const ADMIN: &[Role] = &[Role::Admin];
/// Trucks, drivers, routes, maintenance and location writes.
pub const FLEET: &[Role] = &[Role::Admin, Role::Company, Role::Carrier];
/// Creating and deleting shipments, and paying for them.
pub const SHIPPERS: &[Role] = &[Role::Admin, Role::Company, Role::Individual];
pub const BILLING: &[Role] = &[Role::Admin, Role::Company];

pub fn check(auth: &AuthContext, allowed: &[Role]) -> Result<(), AppError> {
    if auth.role().is_allowed(allowed) {
        Ok(())
    } else {
        tracing::debug!(user_id = auth.user_id(), role = auth.role().as_str(), "role not in allow-list");
        Err(AppError::forbidden("Forbidden: Insufficient permissions"))
    }
}

/// Layered with `from_fn_with_state(ALLOW_LIST, require_role)` inside `require_session`.
pub async fn require_role(
    State(allowed): State<&'static [Role]>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| AppError::unauthorized("Authentication required"))?;
    check(auth, allowed)?;
    Ok(next.run(req).await)
}
