//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Account role; teachers author lessons, students consume them
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub language_preference: String,
    pub has_paid: bool,
    pub payment_reference: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Parsed role; the CHECK constraint keeps the column to known values
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Student)
    }
}

/// Fields needed to insert a user; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub language_preference: String,
}

/// POST /api/auth/signup body
#[derive(Deserialize, Debug)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub language_preference: Option<String>,
}

/// POST /api/auth/login body
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user returned by the auth endpoints
#[derive(Serialize, Debug)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub language_preference: String,
    pub has_paid: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            language_preference: user.language_preference.clone(),
            has_paid: user.has_paid,
        }
    }
}
