use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::dtos::clean;
use crate::dtos::shipment::{CreateShipmentRequest, ShipmentDetail, ShipmentQuery, UpdateShipmentRequest};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::middleware::auth::AuthContext;
use crate::models::shipment::{
    generate_tracking_number, NewShipment, Priority, Shipment, ShipmentChanges, ShipmentFilter,
};
use crate::models::user::Role;
use crate::state::AppState;
use crate::store::RouteRef;

pub(crate) async fn find_shipment(state: &AppState, id: i64) -> AppResult<Shipment> {
    state
        .store
        .find_shipment(id)
        .await?
        .ok_or_else(|| AppError::not_found("Shipment not found"))
}

/// Admins, the customer and the assigned carrier are the parties to a shipment.
pub(crate) fn ensure_party(auth: &AuthContext, shipment: &Shipment) -> AppResult<()> {
    let uid = auth.user_id();
    if auth.is_admin() || shipment.customer_id == uid || shipment.carrier_id == Some(uid) {
        Ok(())
    } else {
        Err(AppError::forbidden("You do not have access to this shipment"))
    }
}

async fn ensure_carrier(state: &AppState, carrier_id: i64) -> AppResult<()> {
    match state.store.find_user(carrier_id).await? {
        Some(user) if user.role == Role::Carrier && user.is_active => Ok(()),
        _ => Err(AppError::validation("Carrier must be an active user with the CARRIER role")),
    }
}

async fn ensure_active_location(state: &AppState, id: i64, label: &str) -> AppResult<()> {
    match state.store.find_location(id).await? {
        Some(location) if location.is_active => Ok(()),
        _ => Err(AppError::not_found(format!("{label} location not found"))),
    }
}

pub async fn list_shipments(
    State(state): State<AppState>,
    Query(query): Query<ShipmentQuery>,
) -> AppResult<Json<Vec<Shipment>>> {
    let filter = ShipmentFilter {
        status: query.status,
        customer_id: query.customer_id,
        carrier_id: query.carrier_id,
    };
    Ok(Json(state.store.list_shipments(&filter).await?))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> AppResult<Json<ShipmentDetail>> {
    let shipment = find_shipment(&state, id).await?;
    ensure_party(&auth, &shipment)?;
    let latest_route = state.store.latest_route(id).await?;
    Ok(Json(ShipmentDetail { shipment, latest_route }))
}

pub async fn create_shipment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateShipmentRequest>,
) -> AppResult<(StatusCode, Json<Shipment>)> {
    if req.origin_id == req.destination_id {
        return Err(AppError::validation("Origin and destination must be different"));
    }
    ensure_active_location(&state, req.origin_id, "Origin").await?;
    ensure_active_location(&state, req.destination_id, "Destination").await?;

    let customer_id = match req.customer_id {
        Some(customer_id) if auth.is_admin() && customer_id != auth.user_id() => {
            if state.store.find_user(customer_id).await?.is_none() {
                return Err(AppError::not_found("Customer not found"));
            }
            customer_id
        }
        _ => auth.user_id(),
    };

    if let Some(carrier_id) = req.carrier_id {
        ensure_carrier(&state, carrier_id).await?;
    }

    let shipment = state
        .store
        .create_shipment(
            NewShipment {
                tracking_number: generate_tracking_number(Utc::now()),
                customer_id,
                carrier_id: req.carrier_id,
                origin_id: req.origin_id,
                destination_id: req.destination_id,
                priority: req.priority.unwrap_or(Priority::Normal),
                weight: req.weight,
                volume: req.volume,
                description: clean(req.description),
                price: req.price,
                scheduled_pickup: req.scheduled_pickup,
                scheduled_delivery: req.scheduled_delivery,
            },
            auth.user_id(),
        )
        .await?;

    tracing::info!(
        shipment_id = shipment.id,
        tracking_number = %shipment.tracking_number,
        customer_id,
        "shipment created"
    );
    Ok((StatusCode::CREATED, Json(shipment)))
}

pub async fn update_shipment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateShipmentRequest>,
) -> AppResult<Json<Shipment>> {
    let shipment = find_shipment(&state, id).await?;
    ensure_party(&auth, &shipment)?;

    if let Some(Some(carrier_id)) = req.carrier_id {
        ensure_carrier(&state, carrier_id).await?;
    }

    let changes = ShipmentChanges {
        status: req.status,
        priority: req.priority,
        carrier_id: req.carrier_id,
        weight: req.weight,
        volume: req.volume,
        description: clean(req.description),
        price: req.price,
        scheduled_pickup: req.scheduled_pickup,
        scheduled_delivery: req.scheduled_delivery,
        ..Default::default()
    };

    let shipment = state
        .store
        .update_shipment(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Shipment not found"))?;
    Ok(Json(shipment))
}

pub async fn delete_shipment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let shipment = find_shipment(&state, id).await?;

    if !auth.is_admin() && shipment.customer_id != auth.user_id() {
        return Err(AppError::forbidden("You can only delete your own shipments"));
    }
    if state.store.has_active_routes(RouteRef::Shipment(id)).await? {
        return Err(AppError::invalid_state("Cannot delete shipment with active routes"));
    }
    if state.store.find_invoice_by_shipment(id).await?.is_some() {
        return Err(AppError::invalid_state("Cannot delete a shipment that has been invoiced"));
    }

    if !state.store.delete_shipment(id).await? {
        return Err(AppError::not_found("Shipment not found"));
    }

    tracing::info!(shipment_id = id, "shipment deleted");
    Ok(StatusCode::NO_CONTENT)
}
