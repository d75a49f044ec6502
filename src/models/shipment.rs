use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shipment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Pending,
    Confirmed,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

impl ShipmentStatus {
    pub const FINISHED: &'static [ShipmentStatus] = &[ShipmentStatus::Delivered, ShipmentStatus::Cancelled];

    pub fn is_active(&self) -> bool {
        !Self::FINISHED.contains(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shipment_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Shipment {
    pub id: i64,
    pub tracking_number: String,
    pub customer_id: i64,
    pub carrier_id: Option<i64>,
    pub origin_id: i64,
    pub destination_id: i64,
    pub status: ShipmentStatus,
    pub priority: Priority,
    pub weight: Option<f64>,
    pub volume: Option<f64>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub scheduled_pickup: Option<DateTime<Utc>>,
    pub scheduled_delivery: Option<DateTime<Utc>>,
    pub actual_pickup: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewShipment {
    pub tracking_number: String,
    pub customer_id: i64,
    pub carrier_id: Option<i64>,
    pub origin_id: i64,
    pub destination_id: i64,
    pub priority: Priority,
    pub weight: Option<f64>,
    pub volume: Option<f64>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub scheduled_pickup: Option<DateTime<Utc>>,
    pub scheduled_delivery: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct ShipmentChanges {
    pub status: Option<ShipmentStatus>,
    pub priority: Option<Priority>,
    pub carrier_id: Option<Option<i64>>,
    pub weight: Option<f64>,
    pub volume: Option<f64>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub scheduled_pickup: Option<DateTime<Utc>>,
    pub scheduled_delivery: Option<DateTime<Utc>>,
    pub actual_pickup: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct ShipmentFilter {
    pub status: Option<ShipmentStatus>,
    pub customer_id: Option<i64>,
    pub carrier_id: Option<i64>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TrackingEntry {
    pub id: i64,
    pub shipment_id: i64,
    pub event: String,
    pub status: Option<ShipmentStatus>,
    pub location_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
    pub updated_by: i64,
    pub recorded_at: DateTime<Utc>,
}

pub struct NewTrackingEntry {
    pub shipment_id: i64,
    pub event: String,
    pub status: Option<ShipmentStatus>,
    pub location_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
    pub updated_by: i64,
}

pub const EVENT_CREATED: &str = "SHIPMENT_CREATED";
pub const EVENT_STATUS: &str = "STATUS_UPDATE";
pub const EVENT_POSITION: &str = "POSITION_UPDATE";

/// `MRT-<unix millis>-<4 random digits>`.
pub fn generate_tracking_number(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(1000..10000);
    format!("MRT-{}-{suffix}", now.timestamp_millis())
}
