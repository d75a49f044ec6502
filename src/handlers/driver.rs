use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::dtos::driver::{CreateDriverRequest, DriverQuery, UpdateDriverRequest};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::models::driver::{Driver, DriverChanges, DriverStatus, NewDriver};
use crate::state::AppState;
use crate::store::RouteRef;

pub async fn list_drivers(
    State(state): State<AppState>,
    Query(query): Query<DriverQuery>,
) -> AppResult<Json<Vec<Driver>>> {
    Ok(Json(state.store.list_drivers(query.status).await?))
}

pub async fn get_driver(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Driver>> {
    let driver = state
        .store
        .find_driver(id)
        .await?
        .ok_or_else(|| AppError::not_found("Driver not found"))?;
    Ok(Json(driver))
}

pub async fn create_driver(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateDriverRequest>,
) -> AppResult<(StatusCode, Json<Driver>)> {
    let license_number = req.license_number.trim().to_string();

    if state.store.find_user(req.user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }
    if state.store.find_driver_by_license(&license_number).await?.is_some() {
        return Err(AppError::conflict("Driver with this license number already exists"));
    }
    if state.store.find_driver_by_user(req.user_id).await?.is_some() {
        return Err(AppError::conflict("User is already registered as a driver"));
    }

    let driver = state
        .store
        .create_driver(NewDriver {
            user_id: req.user_id,
            license_number,
            license_expiry_date: req.license_expiry_date,
            phone_number: req.phone_number.trim().to_string(),
            status: req.status.unwrap_or(DriverStatus::Available),
        })
        .await?;

    tracing::info!(driver_id = driver.id, user_id = driver.user_id, "driver created");
    Ok((StatusCode::CREATED, Json(driver)))
}

pub async fn update_driver(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateDriverRequest>,
) -> AppResult<Json<Driver>> {
    if state.store.find_driver(id).await?.is_none() {
        return Err(AppError::not_found("Driver not found"));
    }

    let license_number = req.license_number.map(|l| l.trim().to_string());
    if let Some(license) = &license_number {
        if let Some(other) = state.store.find_driver_by_license(license).await? {
            if other.id != id {
                return Err(AppError::conflict("Driver with this license number already exists"));
            }
        }
    }

    let changes = DriverChanges {
        license_number,
        license_expiry_date: req.license_expiry_date,
        phone_number: req.phone_number.map(|p| p.trim().to_string()),
        status: req.status,
        rating: req.rating,
    };

    let driver = state
        .store
        .update_driver(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Driver not found"))?;
    Ok(Json(driver))
}

/// Soft delete: the driver becomes INACTIVE and stays referenced by past routes.
pub async fn delete_driver(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Driver>> {
    match state.store.find_driver(id).await? {
        Some(driver) if driver.status != DriverStatus::Inactive => {}
        _ => return Err(AppError::not_found("Driver not found")),
    }

    if state.store.has_active_routes(RouteRef::Driver(id)).await? {
        return Err(AppError::invalid_state("Cannot delete driver with active routes"));
    }

    let changes = DriverChanges { status: Some(DriverStatus::Inactive), ..Default::default() };
    let driver = state
        .store
        .update_driver(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Driver not found"))?;

    tracing::info!(driver_id = id, "driver deactivated");
    Ok(Json(driver))
}
