use serde::Deserialize;
use validator::Validate;

use super::double_option;
use crate::models::truck::{FuelType, TruckStatus};

#[derive(Deserialize, Validate)]
pub struct CreateTruckRequest {
    #[validate(length(min = 1, message = "License plate is required"))]
    pub license_plate: String,
    pub make: Option<String>,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: String,
    #[validate(range(min = 1900, max = 2100, message = "Year must be between 1900 and 2100"))]
    pub year: i32,
    #[validate(range(exclusive_min = 0.0, message = "Capacity must be greater than 0"))]
    pub capacity: f64,
    pub fuel_type: Option<FuelType>,
    pub current_location: Option<String>,
    pub driver_id: Option<i64>,
}

#[derive(Deserialize, Validate)]
pub struct UpdateTruckRequest {
    #[validate(length(min = 1, message = "License plate cannot be empty"))]
    pub license_plate: Option<String>,
    pub make: Option<String>,
    #[validate(length(min = 1, message = "Model cannot be empty"))]
    pub model: Option<String>,
    #[validate(range(min = 1900, max = 2100, message = "Year must be between 1900 and 2100"))]
    pub year: Option<i32>,
    #[validate(range(exclusive_min = 0.0, message = "Capacity must be greater than 0"))]
    pub capacity: Option<f64>,
    pub fuel_type: Option<FuelType>,
    pub status: Option<TruckStatus>,
    pub current_location: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub driver_id: Option<Option<i64>>, // Some(None) unassigns
}

#[derive(Deserialize)]
pub struct TruckQuery {
    pub status: Option<TruckStatus>,
    pub driver_id: Option<i64>,
}
