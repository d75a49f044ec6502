use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::truck::TruckStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "maintenance_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl MaintenanceStatus {
    /// Work has started, so the record is part of the truck's history.
    pub fn is_locked(&self) -> bool {
        matches!(self, MaintenanceStatus::InProgress | MaintenanceStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "maintenance_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenancePriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// A maintenance row joined with the plate and owner of its truck.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MaintenanceRecord {
    pub id: i64,
    pub truck_id: i64,
    pub license_plate: String,
    pub owner_id: i64,
    pub maintenance_type: String,
    pub service_type: String,
    pub description: String,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub cost: Option<f64>,
    pub service_provider: Option<String>,
    pub service_provider_contact: Option<String>,
    pub priority: MaintenancePriority,
    pub status: MaintenanceStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewMaintenance {
    pub truck_id: i64,
    pub maintenance_type: String,
    pub service_type: String,
    pub description: String,
    pub scheduled_date: Option<NaiveDate>,
    pub cost: Option<f64>,
    pub service_provider: Option<String>,
    pub service_provider_contact: Option<String>,
    pub priority: MaintenancePriority,
    pub notes: Option<String>,
}

#[derive(Default)]
pub struct MaintenanceChanges {
    pub maintenance_type: Option<String>,
    pub service_type: Option<String>,
    pub description: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub cost: Option<f64>,
    pub service_provider: Option<String>,
    pub service_provider_contact: Option<String>,
    pub priority: Option<MaintenancePriority>,
    pub status: Option<MaintenanceStatus>,
    pub notes: Option<String>,
}

/// What a maintenance write does to the truck it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruckServiceChange {
    pub status: TruckStatus,
    /// Stamped as the truck's `last_maintenance_date`.
    pub serviced_on: Option<NaiveDate>,
}

impl TruckServiceChange {
    /// Urgent jobs and jobs already due take the truck off the road at once.
    pub fn on_schedule(priority: MaintenancePriority, scheduled: Option<NaiveDate>, today: NaiveDate) -> Option<Self> {
        let due = scheduled.is_some_and(|d| d <= today);
        (priority == MaintenancePriority::Urgent || due)
            .then_some(Self { status: TruckStatus::Maintenance, serviced_on: None })
    }

    pub fn on_status(status: MaintenanceStatus, today: NaiveDate) -> Option<Self> {
        match status {
            MaintenanceStatus::InProgress => Some(Self { status: TruckStatus::Maintenance, serviced_on: None }),
            MaintenanceStatus::Completed => Some(Self { status: TruckStatus::Available, serviced_on: Some(today) }),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct MaintenanceFilter {
    /// Restricts to trucks owned by this user.
    pub owner_id: Option<i64>,
    pub truck_id: Option<i64>,
    pub status: Option<MaintenanceStatus>,
    pub priority: Option<MaintenancePriority>,
}
