use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Permission tier every authorization decision branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Company,
    Carrier,
    Individual,
}

impl Role {
    pub const ALL: &'static [Role] = &[Role::Admin, Role::Company, Role::Carrier, Role::Individual];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Company => "COMPANY",
            Role::Carrier => "CARRIER",
            Role::Individual => "INDIVIDUAL",
        }
    }

    pub fn is_allowed(&self, allowed: &[Role]) -> bool {
        allowed.contains(self)
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "COMPANY" => Ok(Role::Company),
            "CARRIER" => Ok(Role::Carrier),
            "INDIVIDUAL" => Ok(Role::Individual),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[derive(Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
}

/// Admin-side edit of any account.
#[derive(Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.role.is_none_or(|r| user.role == r)
            && self.is_active.is_none_or(|a| user.is_active == a)
            && self.search.as_ref().is_none_or(|q| {
                let q = q.to_lowercase();
                user.name.to_lowercase().contains(&q) || user.email.to_lowercase().contains(&q)
            })
    }
}
