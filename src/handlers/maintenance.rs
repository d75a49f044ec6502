use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::dtos::auth::MessageResponse;
use crate::dtos::clean;
use crate::dtos::maintenance::{
    CreateMaintenanceRequest, MaintenanceList, MaintenanceQuery, UpdateMaintenanceRequest,
};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::middleware::auth::AuthContext;
use crate::models::maintenance::{
    MaintenanceChanges, MaintenanceFilter, MaintenancePriority, MaintenanceRecord, MaintenanceStatus,
    NewMaintenance, TruckServiceChange,
};
use crate::state::AppState;

/// Non-admins only ever touch the records of trucks they own.
async fn find_owned_record(state: &AppState, auth: &AuthContext, id: i64) -> AppResult<MaintenanceRecord> {
    let record = state
        .store
        .find_maintenance(id)
        .await?
        .ok_or_else(|| AppError::not_found("Maintenance record not found"))?;

    if !auth.is_admin() && record.owner_id != auth.user_id() {
        return Err(AppError::forbidden("You do not have access to this maintenance record"));
    }
    Ok(record)
}

pub async fn list_maintenance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<MaintenanceQuery>,
) -> AppResult<Json<MaintenanceList>> {
    let window = query.window();
    let offset = window.offset()?;
    let filter = MaintenanceFilter {
        owner_id: (!auth.is_admin()).then(|| auth.user_id()),
        truck_id: query.truck_id,
        status: query.status,
        priority: query.priority,
    };

    let result = state.store.list_maintenance(&filter, window.limit, offset).await?;
    Ok(Json(MaintenanceList {
        maintenance: result.items,
        pagination: window.pagination(result.total),
    }))
}

pub async fn get_maintenance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> AppResult<Json<MaintenanceRecord>> {
    Ok(Json(find_owned_record(&state, &auth, id).await?))
}

pub async fn create_maintenance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateMaintenanceRequest>,
) -> AppResult<(StatusCode, Json<MaintenanceRecord>)> {
    let truck = state
        .store
        .find_truck(req.truck_id)
        .await?
        .ok_or_else(|| AppError::not_found("Truck not found"))?;

    if !auth.is_admin() && truck.owner_id != auth.user_id() {
        return Err(AppError::forbidden("Unauthorized to schedule maintenance for this truck"));
    }

    let priority = req.priority.unwrap_or(MaintenancePriority::Medium);
    let grounding = TruckServiceChange::on_schedule(priority, req.scheduled_date, Utc::now().date_naive());

    let record = state
        .store
        .create_maintenance(
            NewMaintenance {
                truck_id: truck.id,
                maintenance_type: req.maintenance_type.trim().to_string(),
                service_type: req.service_type.trim().to_string(),
                description: req.description.trim().to_string(),
                scheduled_date: req.scheduled_date,
                cost: req.cost,
                service_provider: clean(req.service_provider),
                service_provider_contact: clean(req.service_provider_contact),
                priority,
                notes: clean(req.notes),
            },
            grounding,
        )
        .await?;

    tracing::info!(
        maintenance_id = record.id,
        truck_id = record.truck_id,
        grounded = grounding.is_some(),
        "maintenance scheduled"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_maintenance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateMaintenanceRequest>,
) -> AppResult<Json<MaintenanceRecord>> {
    find_owned_record(&state, &auth, id).await?;

    let today = Utc::now().date_naive();
    let truck_change = req.status.and_then(|status| TruckServiceChange::on_status(status, today));
    let completed_date = match req.status {
        Some(MaintenanceStatus::Completed) => req.completed_date.or(Some(today)),
        _ => req.completed_date,
    };

    let changes = MaintenanceChanges {
        maintenance_type: clean(req.maintenance_type),
        service_type: clean(req.service_type),
        description: clean(req.description),
        scheduled_date: req.scheduled_date,
        completed_date,
        cost: req.cost,
        service_provider: clean(req.service_provider),
        service_provider_contact: clean(req.service_provider_contact),
        priority: req.priority,
        status: req.status,
        notes: clean(req.notes),
    };

    let record = state
        .store
        .update_maintenance(id, changes, truck_change)
        .await?
        .ok_or_else(|| AppError::not_found("Maintenance record not found"))?;

    if let Some(change) = truck_change {
        tracing::info!(maintenance_id = id, truck_id = record.truck_id, truck_status = ?change.status, "truck serviced");
    }
    Ok(Json(record))
}

/// Only records whose work has not started can be removed.
pub async fn delete_maintenance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    let record = find_owned_record(&state, &auth, id).await?;

    if record.status.is_locked() {
        return Err(AppError::validation(
            "Cannot delete maintenance record that is in progress or completed",
        ));
    }
    if !state.store.delete_maintenance(id).await? {
        return Err(AppError::not_found("Maintenance record not found"));
    }

    tracing::info!(maintenance_id = id, "maintenance record deleted");
    Ok(Json(MessageResponse { message: "Maintenance record deleted successfully" }))
}
