use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "driver_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    Available,
    OnDuty,
    OffDuty,
    /// Soft-deleted.
    Inactive,
}

/// Driver row joined with the owning user's name and email.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Driver {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub license_number: String,
    pub license_expiry_date: NaiveDate,
    pub phone_number: String,
    pub status: DriverStatus,
    pub rating: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewDriver {
    pub user_id: i64,
    pub license_number: String,
    pub license_expiry_date: NaiveDate,
    pub phone_number: String,
    pub status: DriverStatus,
}

#[derive(Default)]
pub struct DriverChanges {
    pub license_number: Option<String>,
    pub license_expiry_date: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub status: Option<DriverStatus>,
    pub rating: Option<f64>,
}
