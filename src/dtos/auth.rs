use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::UserResponse;

#[derive(Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    /// individual, carrier or company; admins are never self-registered.
    pub role: String,
    pub company: Option<String>,
    pub phone: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user: Option<UserResponse>,
}

#[derive(Deserialize, Validate)]
pub struct ResetRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Deserialize, Validate)]
pub struct ResetConfirmRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
