use serde::Deserialize;
use validator::Validate;

#[derive(Deserialize, Validate)]
pub struct CreateLocationRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    pub state: Option<String>,
    #[validate(length(min = 1, message = "Country is required"))]
    pub country: String,
    pub postal_code: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,
}

#[derive(Deserialize, Validate)]
pub struct UpdateLocationRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Address cannot be empty"))]
    pub address: Option<String>,
    #[validate(length(min = 1, message = "City cannot be empty"))]
    pub city: Option<String>,
    pub state: Option<String>,
    #[validate(length(min = 1, message = "Country cannot be empty"))]
    pub country: Option<String>,
    pub postal_code: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,
}

#[derive(Deserialize)]
pub struct LocationQuery {
    pub city: Option<String>,
    pub query: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}
