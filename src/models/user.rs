use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CompanyType {
    Retailer,
    Wholesaler,
    Distributor,
    Manufacturer,
    Other,
}

impl CompanyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyType::Retailer => "retailer",
            CompanyType::Wholesaler => "wholesaler",
            CompanyType::Distributor => "distributor",
            CompanyType::Manufacturer => "manufacturer",
            CompanyType::Other => "other",
        }
    }
}

impl FromStr for CompanyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retailer" => Ok(CompanyType::Retailer),
            "wholesaler" => Ok(CompanyType::Wholesaler),
            "distributor" => Ok(CompanyType::Distributor),
            "manufacturer" => Ok(CompanyType::Manufacturer),
            "other" => Ok(CompanyType::Other),
            other => Err(format!("unknown company type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CompanyRole {
    Owner,
    Manager,
    Purchasing,
    Sales,
    Other,
}

impl CompanyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyRole::Owner => "owner",
            CompanyRole::Manager => "manager",
            CompanyRole::Purchasing => "purchasing",
            CompanyRole::Sales => "sales",
            CompanyRole::Other => "other",
        }
    }
}

impl FromStr for CompanyRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(CompanyRole::Owner),
            "manager" => Ok(CompanyRole::Manager),
            "purchasing" => Ok(CompanyRole::Purchasing),
            "sales" => Ok(CompanyRole::Sales),
            "other" => Ok(CompanyRole::Other),
            other => Err(format!("unknown company role: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub company_name: String,
    pub company_type: CompanyType,
    pub company_role: CompanyRole,
    pub address: Option<JsonValue>,
    pub role: Role,
    pub email_verified: bool,
    pub email_verification_token: Option<String>,
    pub email_verification_expires: Option<DateTime<Utc>>,
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Enums are stored as TEXT, so the row mapping is spelled out by hand.
impl<'r> sqlx::FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let company_type: String = row.try_get("company_type")?;
        let company_role: String = row.try_get("company_role")?;

        Ok(User {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            phone: row.try_get("phone")?,
            company_name: row.try_get("company_name")?,
            company_type: company_type.parse().map_err(|e: String| {
                sqlx::Error::ColumnDecode {
                    index: "company_type".into(),
                    source: e.into(),
                }
            })?,
            company_role: company_role.parse().map_err(|e: String| {
                sqlx::Error::ColumnDecode {
                    index: "company_role".into(),
                    source: e.into(),
                }
            })?,
            address: row.try_get("address")?,
            role: role.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
                index: "role".into(),
                source: e.into(),
            })?,
            email_verified: row.try_get("email_verified")?,
            email_verification_token: row.try_get("email_verification_token")?,
            email_verification_expires: row.try_get("email_verification_expires")?,
            reset_password_token: row.try_get("reset_password_token")?,
            reset_password_expires: row.try_get("reset_password_expires")?,
            is_active: row.try_get("is_active")?,
            last_login_at: row.try_get("last_login_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Outward projection of a user. Never carries the password hash or the
/// verification/reset token fields.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company_name: String,
    pub company_type: CompanyType,
    pub company_role: CompanyRole,
    pub address: Option<JsonValue>,
    pub role: Role,
    pub email_verified: bool,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            company_name: user.company_name,
            company_type: user.company_type,
            company_role: user.company_role,
            address: user.address,
            role: user.role,
            email_verified: user.email_verified,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}
