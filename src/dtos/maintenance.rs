use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::page::{PageWindow, Pagination};
use crate::models::maintenance::{MaintenancePriority, MaintenanceRecord, MaintenanceStatus};

#[derive(Deserialize, Validate)]
pub struct CreateMaintenanceRequest {
    pub truck_id: i64,
    #[validate(length(min = 1, message = "Maintenance type is required"))]
    pub maintenance_type: String,
    #[validate(length(min = 1, message = "Service type is required"))]
    pub service_type: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub scheduled_date: Option<NaiveDate>,
    #[validate(range(min = 0.0, message = "Cost cannot be negative"))]
    pub cost: Option<f64>,
    pub service_provider: Option<String>,
    pub service_provider_contact: Option<String>,
    pub priority: Option<MaintenancePriority>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct UpdateMaintenanceRequest {
    #[validate(length(min = 1, message = "Maintenance type cannot be empty"))]
    pub maintenance_type: Option<String>,
    #[validate(length(min = 1, message = "Service type cannot be empty"))]
    pub service_type: Option<String>,
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    #[validate(range(min = 0.0, message = "Cost cannot be negative"))]
    pub cost: Option<f64>,
    pub service_provider: Option<String>,
    pub service_provider_contact: Option<String>,
    pub priority: Option<MaintenancePriority>,
    pub status: Option<MaintenanceStatus>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct MaintenanceQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<MaintenanceStatus>,
    pub priority: Option<MaintenancePriority>,
    pub truck_id: Option<i64>,
}

impl MaintenanceQuery {
    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.page, self.limit)
    }
}

#[derive(Serialize)]
pub struct MaintenanceList {
    pub maintenance: Vec<MaintenanceRecord>,
    pub pagination: Pagination,
}
