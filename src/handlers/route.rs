use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::dtos::route::{CreateRouteRequest, RouteQuery, UpdateRouteRequest};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::models::driver::DriverStatus;
use crate::models::route::{NewRoute, Route, RouteChanges, RouteFilter, RouteStatus};
use crate::state::AppState;

async fn ensure_refs(state: &AppState, truck_id: Option<i64>, driver_id: Option<i64>) -> AppResult<()> {
    if let Some(truck_id) = truck_id {
        if state.store.find_truck(truck_id).await?.is_none() {
            return Err(AppError::not_found("Truck not found"));
        }
    }
    if let Some(driver_id) = driver_id {
        match state.store.find_driver(driver_id).await? {
            Some(driver) if driver.status != DriverStatus::Inactive => {}
            _ => return Err(AppError::not_found("Driver not found")),
        }
    }
    Ok(())
}

pub async fn list_routes(
    State(state): State<AppState>,
    Query(query): Query<RouteQuery>,
) -> AppResult<Json<Vec<Route>>> {
    let filter = RouteFilter { status: query.status, shipment_id: query.shipment_id };
    Ok(Json(state.store.list_routes(&filter).await?))
}

pub async fn get_route(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Route>> {
    let route = state
        .store
        .find_route(id)
        .await?
        .ok_or_else(|| AppError::not_found("Route not found"))?;
    Ok(Json(route))
}

pub async fn create_route(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateRouteRequest>,
) -> AppResult<(StatusCode, Json<Route>)> {
    if state.store.find_shipment(req.shipment_id).await?.is_none() {
        return Err(AppError::not_found("Shipment not found"));
    }
    ensure_refs(&state, req.truck_id, req.driver_id).await?;

    let route = state
        .store
        .create_route(NewRoute {
            shipment_id: req.shipment_id,
            truck_id: req.truck_id,
            driver_id: req.driver_id,
            status: req.status.unwrap_or(RouteStatus::Planned),
        })
        .await?;

    tracing::info!(route_id = route.id, shipment_id = route.shipment_id, "route planned");
    Ok((StatusCode::CREATED, Json(route)))
}

pub async fn update_route(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateRouteRequest>,
) -> AppResult<Json<Route>> {
    if state.store.find_route(id).await?.is_none() {
        return Err(AppError::not_found("Route not found"));
    }
    ensure_refs(&state, req.truck_id.flatten(), req.driver_id.flatten()).await?;

    let changes = RouteChanges { truck_id: req.truck_id, driver_id: req.driver_id, status: req.status };
    let route = state
        .store
        .update_route(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Route not found"))?;
    Ok(Json(route))
}
