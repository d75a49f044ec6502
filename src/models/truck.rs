use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "truck_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TruckStatus {
    Available,
    InTransit,
    Maintenance,
    OutOfService,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "fuel_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuelType {
    Diesel,
    Gasoline,
    Electric,
    Hybrid,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Truck {
    pub id: i64,
    pub license_plate: String,
    pub make: Option<String>,
    pub model: String,
    pub year: i32,
    pub capacity: f64,
    pub fuel_type: FuelType,
    pub status: TruckStatus,
    pub current_location: Option<String>,
    pub driver_id: Option<i64>,
    pub owner_id: i64,
    pub last_maintenance_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewTruck {
    pub license_plate: String,
    pub make: Option<String>,
    pub model: String,
    pub year: i32,
    pub capacity: f64,
    pub fuel_type: FuelType,
    pub current_location: Option<String>,
    pub driver_id: Option<i64>,
    pub owner_id: i64,
}

#[derive(Default)]
pub struct TruckChanges {
    pub license_plate: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub capacity: Option<f64>,
    pub fuel_type: Option<FuelType>,
    pub status: Option<TruckStatus>,
    pub current_location: Option<String>,
    /// `Some(None)` unassigns the driver.
    pub driver_id: Option<Option<i64>>,
}

#[derive(Default)]
pub struct TruckFilter {
    pub status: Option<TruckStatus>,
    pub driver_id: Option<i64>,
}
