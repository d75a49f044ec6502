use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::page::{PageWindow, Pagination};
use crate::models::user::{Role, User};

/// Public view of a user; never carries the password hash.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            phone: user.phone,
            company: user.company,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

#[derive(Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl UserQuery {
    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.page, self.limit)
    }
}

#[derive(Serialize)]
pub struct UserList {
    pub users: Vec<UserResponse>,
    pub pagination: Pagination,
}

/// Admin edit of any account. Absent fields are left as they are.
#[derive(Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Serialize)]
pub struct UserUpdatedResponse {
    pub message: &'static str,
    pub user: UserResponse,
}
