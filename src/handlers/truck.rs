use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::dtos::clean;
use crate::dtos::truck::{CreateTruckRequest, TruckQuery, UpdateTruckRequest};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::middleware::auth::AuthContext;
use crate::models::driver::DriverStatus;
use crate::models::truck::{FuelType, NewTruck, Truck, TruckChanges, TruckFilter};
use crate::state::AppState;
use crate::store::RouteRef;

/// Only existing, non-deactivated drivers can be put behind a wheel.
async fn ensure_assignable_driver(state: &AppState, driver_id: i64) -> AppResult<()> {
    match state.store.find_driver(driver_id).await? {
        Some(driver) if driver.status != DriverStatus::Inactive => Ok(()),
        _ => Err(AppError::not_found("Driver not found")),
    }
}

pub async fn list_trucks(
    State(state): State<AppState>,
    Query(query): Query<TruckQuery>,
) -> AppResult<Json<Vec<Truck>>> {
    let filter = TruckFilter { status: query.status, driver_id: query.driver_id };
    Ok(Json(state.store.list_trucks(&filter).await?))
}

pub async fn get_truck(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Truck>> {
    let truck = state
        .store
        .find_truck(id)
        .await?
        .ok_or_else(|| AppError::not_found("Truck not found"))?;
    Ok(Json(truck))
}

pub async fn create_truck(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateTruckRequest>,
) -> AppResult<(StatusCode, Json<Truck>)> {
    let license_plate = req.license_plate.trim().to_uppercase();

    if let Some(driver_id) = req.driver_id {
        ensure_assignable_driver(&state, driver_id).await?;
    }
    if state.store.find_truck_by_plate(&license_plate).await?.is_some() {
        return Err(AppError::conflict("Truck with this license plate already exists"));
    }

    let truck = state
        .store
        .create_truck(NewTruck {
            license_plate,
            make: clean(req.make),
            model: req.model.trim().to_string(),
            year: req.year,
            capacity: req.capacity,
            fuel_type: req.fuel_type.unwrap_or(FuelType::Diesel),
            current_location: clean(req.current_location),
            driver_id: req.driver_id,
            owner_id: auth.user_id(),
        })
        .await?;

    tracing::info!(truck_id = truck.id, owner_id = truck.owner_id, "truck created");
    Ok((StatusCode::CREATED, Json(truck)))
}

pub async fn update_truck(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateTruckRequest>,
) -> AppResult<Json<Truck>> {
    if state.store.find_truck(id).await?.is_none() {
        return Err(AppError::not_found("Truck not found"));
    }

    let license_plate = req.license_plate.map(|p| p.trim().to_uppercase());
    if let Some(plate) = &license_plate {
        if let Some(other) = state.store.find_truck_by_plate(plate).await? {
            if other.id != id {
                return Err(AppError::conflict("Truck with this license plate already exists"));
            }
        }
    }
    if let Some(Some(driver_id)) = req.driver_id {
        ensure_assignable_driver(&state, driver_id).await?;
    }

    let changes = TruckChanges {
        license_plate,
        make: clean(req.make),
        model: req.model.map(|m| m.trim().to_string()),
        year: req.year,
        capacity: req.capacity,
        fuel_type: req.fuel_type,
        status: req.status,
        current_location: clean(req.current_location),
        driver_id: req.driver_id,
    };

    let truck = state
        .store
        .update_truck(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Truck not found"))?;
    Ok(Json(truck))
}

pub async fn delete_truck(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<StatusCode> {
    if state.store.find_truck(id).await?.is_none() {
        return Err(AppError::not_found("Truck not found"));
    }
    if state.store.has_active_routes(RouteRef::Truck(id)).await? {
        return Err(AppError::invalid_state("Cannot delete truck with active routes"));
    }

    if !state.store.delete_truck(id).await? {
        return Err(AppError::not_found("Truck not found"));
    }

    tracing::info!(truck_id = id, "truck deleted");
    Ok(StatusCode::NO_CONTENT)
}
