use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "route_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl RouteStatus {
    /// Statuses that block deleting the truck, driver or shipment on the route.
    pub const ACTIVE: &'static [RouteStatus] = &[RouteStatus::Planned, RouteStatus::InProgress];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Route {
    pub id: i64,
    pub shipment_id: i64,
    pub truck_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub status: RouteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewRoute {
    pub shipment_id: i64,
    pub truck_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub status: RouteStatus,
}

#[derive(Default)]
pub struct RouteChanges {
    pub truck_id: Option<Option<i64>>,
    pub driver_id: Option<Option<i64>>,
    pub status: Option<RouteStatus>,
}

#[derive(Default)]
pub struct RouteFilter {
    pub status: Option<RouteStatus>,
    pub shipment_id: Option<i64>,
}
