use crate::error::{Error, Result};
use crate::models::user::{CompanyRole, CompanyType, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres, QueryBuilder};

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, phone, \
     company_name, company_type, company_role, address, role, email_verified, \
     email_verification_token, email_verification_expires, reset_password_token, \
     reset_password_expires, is_active, last_login_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub company_name: String,
    pub company_type: CompanyType,
    pub company_role: CompanyRole,
    pub address: Option<JsonValue>,
}

/// Profile fields a user may change about themselves. Anything not listed
/// here is not mutable through the profile endpoint.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub company_type: Option<CompanyType>,
    pub company_role: Option<CompanyRole>,
    pub address: Option<JsonValue>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// Names of the fields being changed, for the audit trail. Values are
    /// deliberately not included.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.first_name.is_some() {
            fields.push("firstName");
        }
        if self.last_name.is_some() {
            fields.push("lastName");
        }
        if self.phone.is_some() {
            fields.push("phone");
        }
        if self.company_name.is_some() {
            fields.push("companyName");
        }
        if self.company_type.is_some() {
            fields.push("companyType");
        }
        if self.company_role.is_some() {
            fields.push("companyRole");
        }
        if self.address.is_some() {
            fields.push("address");
        }
        fields
    }
}

/// Credential store seam. The orchestrator only talks to this trait; the
/// Postgres implementation below is swapped for an in-memory one in tests.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn insert(&self, new_user: NewUser) -> Result<User>;
    async fn update_last_login(&self, id: i64) -> Result<()>;
    async fn set_verification_token(
        &self,
        id: i64,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<()>;
    async fn mark_email_verified(&self, id: i64) -> Result<()>;
    async fn set_reset_token(&self, id: i64, token: &str, expires: DateTime<Utc>) -> Result<()>;
    /// Stores the new hash, clears both token pairs and forces
    /// `email_verified` in one statement: completing a reset proves the user
    /// controls the mailbox.
    async fn apply_password_reset(&self, id: i64, password_hash: &str) -> Result<()>;
    async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<()>;
    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<User>;
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert(&self, new_user: NewUser) -> Result<User> {
        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users
                (first_name, last_name, email, password_hash, phone,
                 company_name, company_type, company_role, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.phone)
        .bind(&new_user.company_name)
        .bind(new_user.company_type.as_str())
        .bind(new_user.company_role.as_str())
        .bind(&new_user.address)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(Error::Conflict(
                "An account with this email already exists".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_last_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_verification_token(
        &self,
        id: i64,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET email_verification_token = $1, email_verification_expires = $2, \
             updated_at = NOW() WHERE id = $3",
        )
        .bind(token)
        .bind(expires)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_email_verified(&self, id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE users SET email_verified = TRUE, email_verification_token = NULL, \
             email_verification_expires = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_reset_token(&self, id: i64, token: &str, expires: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE users SET reset_password_token = $1, reset_password_expires = $2, \
             updated_at = NOW() WHERE id = $3",
        )
        .bind(token)
        .bind(expires)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn apply_password_reset(&self, id: i64, password_hash: &str) -> Result<()> {
        sqlx::query(
            "UPDATE users SET password_hash = $1, reset_password_token = NULL, \
             reset_password_expires = NULL, email_verified = TRUE, \
             email_verification_token = NULL, email_verification_expires = NULL, \
             updated_at = NOW() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<User> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET updated_at = NOW()");
        if let Some(first_name) = &changes.first_name {
            qb.push(", first_name = ").push_bind(first_name);
        }
        if let Some(last_name) = &changes.last_name {
            qb.push(", last_name = ").push_bind(last_name);
        }
        if let Some(phone) = &changes.phone {
            qb.push(", phone = ").push_bind(phone);
        }
        if let Some(company_name) = &changes.company_name {
            qb.push(", company_name = ").push_bind(company_name);
        }
        if let Some(company_type) = changes.company_type {
            qb.push(", company_type = ").push_bind(company_type.as_str());
        }
        if let Some(company_role) = changes.company_role {
            qb.push(", company_role = ").push_bind(company_role.as_str());
        }
        if let Some(address) = &changes.address {
            qb.push(", address = ").push_bind(address);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(&format!(" RETURNING {}", USER_COLUMNS));

        let user = qb.build_query_as::<User>().fetch_one(&self.pool).await?;
        Ok(user)
    }
}
