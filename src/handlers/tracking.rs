use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use super::shipment::{ensure_party, find_shipment};
use crate::dtos::clean;
use crate::dtos::shipment::{TrackingHistory, TrackingRequest};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::middleware::auth::AuthContext;
use crate::models::shipment::{
    NewTrackingEntry, ShipmentChanges, ShipmentStatus, TrackingEntry, EVENT_POSITION, EVENT_STATUS,
};
use crate::state::AppState;

pub async fn get_tracking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> AppResult<Json<TrackingHistory>> {
    let shipment = find_shipment(&state, id).await?;
    ensure_party(&auth, &shipment)?;

    let tracking_history = state.store.list_tracking(id).await?;
    Ok(Json(TrackingHistory {
        shipment_id: id,
        total_updates: tracking_history.len(),
        tracking_history,
    }))
}

pub async fn add_tracking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<TrackingRequest>,
) -> AppResult<(StatusCode, Json<TrackingEntry>)> {
    let shipment = find_shipment(&state, id).await?;

    if !auth.is_admin() && shipment.carrier_id != Some(auth.user_id()) {
        return Err(AppError::forbidden("Only the assigned carrier can update tracking"));
    }
    if req.status.is_none() && req.location_id.is_none() && req.latitude.is_none() && req.longitude.is_none() {
        return Err(AppError::validation("A status or a position is required"));
    }
    if let Some(location_id) = req.location_id {
        if state.store.find_location(location_id).await?.is_none() {
            return Err(AppError::not_found("Location not found"));
        }
    }

    let now = Utc::now();
    let changes = ShipmentChanges {
        status: req.status,
        actual_pickup: (req.status == Some(ShipmentStatus::PickedUp)).then_some(now),
        actual_delivery: (req.status == Some(ShipmentStatus::Delivered)).then_some(now),
        ..Default::default()
    };
    let event = if req.status.is_some() { EVENT_STATUS } else { EVENT_POSITION };

    let entry = state
        .store
        .record_tracking(
            NewTrackingEntry {
                shipment_id: id,
                event: event.to_string(),
                status: req.status,
                location_id: req.location_id,
                latitude: req.latitude,
                longitude: req.longitude,
                notes: clean(req.notes),
                updated_by: auth.user_id(),
            },
            changes,
        )
        .await?;

    tracing::info!(shipment_id = id, event, "tracking updated");
    Ok((StatusCode::CREATED, Json(entry)))
}
