use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Buyer,
    Admin,
    Supplier,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Farmer, Role::Buyer, Role::Admin, Role::Supplier];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Buyer => "buyer",
            Role::Admin => "admin",
            Role::Supplier => "supplier",
        }
    }

    /// Farmers and suppliers sell, so an admin has to approve them first.
    pub fn needs_approval(self) -> bool {
        matches!(self, Role::Farmer | Role::Supplier)
    }

    pub fn can_sell(self) -> bool {
        matches!(self, Role::Farmer | Role::Supplier)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "farmer" => Ok(Role::Farmer),
            "buyer" => Ok(Role::Buyer),
            "admin" => Ok(Role::Admin),
            "supplier" => Ok(Role::Supplier),
            other => Err(AppError::invalid_input(format!("Invalid role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
    pub approved: bool,
    #[serde(default)]
    pub blocked: bool,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, phone: String, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        User {
            id: ObjectId::new(),
            name,
            phone,
            password_hash,
            role,
            approved: !role.needs_approval(),
            blocked: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(length(min = 2, max = 80, message = "Name must be 2-80 characters"))]
    pub name: String,

    #[validate(length(min = 10, max = 15, message = "Phone must be 10-15 characters"))]
    pub phone: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginUser {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub phone: String,
    pub role: Role,
    pub approved: bool,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.to_hex(),
            name: user.name,
            phone: user.phone,
            role: user.role,
            approved: user.approved,
            blocked: user.blocked,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub phone: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<ObjectId> {
        ObjectId::parse_str(&self.sub).map_err(|_| AppError::AuthError)
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "role '{}' cannot perform this action",
                self.role
            )))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
