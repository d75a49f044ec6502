use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::models::driver::DriverStatus;

#[derive(Deserialize, Validate)]
pub struct CreateDriverRequest {
    pub user_id: i64,
    #[validate(length(min = 1, message = "License number is required"))]
    pub license_number: String,
    pub license_expiry_date: NaiveDate,
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone_number: String,
    pub status: Option<DriverStatus>,
}

#[derive(Deserialize, Validate)]
pub struct UpdateDriverRequest {
    #[validate(length(min = 1, message = "License number cannot be empty"))]
    pub license_number: Option<String>,
    pub license_expiry_date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "Phone number cannot be empty"))]
    pub phone_number: Option<String>,
    pub status: Option<DriverStatus>,
    #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
    pub rating: Option<f64>,
}

#[derive(Deserialize)]
pub struct DriverQuery {
    pub status: Option<DriverStatus>,
}
