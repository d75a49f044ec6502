use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::dtos::clean;
use crate::dtos::location::{CreateLocationRequest, LocationQuery, UpdateLocationRequest};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::models::location::{Location, LocationChanges, LocationFilter, NewLocation};
use crate::state::AppState;

pub async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Vec<Location>>> {
    let filter = LocationFilter {
        city: clean(query.city),
        query: clean(query.query),
        include_inactive: query.include_inactive,
    };
    Ok(Json(state.store.list_locations(&filter).await?))
}

pub async fn get_location(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Location>> {
    let location = state
        .store
        .find_location(id)
        .await?
        .ok_or_else(|| AppError::not_found("Location not found"))?;
    Ok(Json(location))
}

pub async fn create_location(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateLocationRequest>,
) -> AppResult<(StatusCode, Json<Location>)> {
    let location = state
        .store
        .create_location(NewLocation {
            name: req.name.trim().to_string(),
            address: req.address.trim().to_string(),
            city: req.city.trim().to_string(),
            state: clean(req.state),
            country: req.country.trim().to_string(),
            postal_code: clean(req.postal_code),
            latitude: req.latitude,
            longitude: req.longitude,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(location)))
}

pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateLocationRequest>,
) -> AppResult<Json<Location>> {
    let changes = LocationChanges {
        name: clean(req.name),
        address: clean(req.address),
        city: clean(req.city),
        state: clean(req.state),
        country: clean(req.country),
        postal_code: clean(req.postal_code),
        latitude: req.latitude,
        longitude: req.longitude,
    };

    let location = state
        .store
        .update_location(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Location not found"))?;
    Ok(Json(location))
}

/// Soft delete, refused while an unfinished shipment starts or ends here.
pub async fn delete_location(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Location>> {
    match state.store.find_location(id).await? {
        Some(location) if location.is_active => {}
        _ => return Err(AppError::not_found("Location not found")),
    }

    if state.store.location_has_active_shipments(id).await? {
        return Err(AppError::invalid_state("Cannot delete location used by active shipments"));
    }

    let location = state
        .store
        .deactivate_location(id)
        .await?
        .ok_or_else(|| AppError::not_found("Location not found"))?;

    tracing::info!(location_id = id, "location deactivated");
    Ok(Json(location))
}
