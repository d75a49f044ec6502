use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::double_option;
use crate::models::route::Route;
use crate::models::shipment::{Priority, Shipment, ShipmentStatus, TrackingEntry};

#[derive(Deserialize, Validate)]
pub struct CreateShipmentRequest {
    /// Honoured for admins only; everyone else ships as themselves.
    pub customer_id: Option<i64>,
    pub carrier_id: Option<i64>,
    pub origin_id: i64,
    pub destination_id: i64,
    pub priority: Option<Priority>,
    #[validate(range(exclusive_min = 0.0, message = "Weight must be greater than 0"))]
    pub weight: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "Volume must be greater than 0"))]
    pub volume: Option<f64>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    pub scheduled_pickup: Option<DateTime<Utc>>,
    pub scheduled_delivery: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Validate)]
pub struct UpdateShipmentRequest {
    pub status: Option<ShipmentStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    pub carrier_id: Option<Option<i64>>,
    #[validate(range(exclusive_min = 0.0, message = "Weight must be greater than 0"))]
    pub weight: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "Volume must be greater than 0"))]
    pub volume: Option<f64>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    pub scheduled_pickup: Option<DateTime<Utc>>,
    pub scheduled_delivery: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct ShipmentQuery {
    pub status: Option<ShipmentStatus>,
    pub customer_id: Option<i64>,
    pub carrier_id: Option<i64>,
}

#[derive(Serialize)]
pub struct ShipmentDetail {
    #[serde(flatten)]
    pub shipment: Shipment,
    pub latest_route: Option<Route>,
}

#[derive(Deserialize, Validate)]
pub struct TrackingRequest {
    pub status: Option<ShipmentStatus>,
    pub location_id: Option<i64>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct TrackingHistory {
    pub shipment_id: i64,
    pub tracking_history: Vec<TrackingEntry>,
    pub total_updates: usize,
}
