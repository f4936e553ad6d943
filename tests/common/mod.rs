use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use storefront_backend::config::AuthConfig;
use storefront_backend::database::user_store::{NewUser, ProfileChanges, UserStore};
use storefront_backend::error::{Error, Result};
use storefront_backend::models::audit_log::AuditLog;
use storefront_backend::models::user::{Role, User};
use storefront_backend::services::audit_service::ActivityLogger;
use storefront_backend::services::auth_service::AuthService;
use storefront_backend::services::email_service::EmailDispatcher;
use storefront_backend::services::password_service::PasswordService;
use storefront_backend::services::token_service::TokenService;

/// In-memory credential store standing in for Postgres.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<i64, User>>,
    next_id: AtomicI64,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn get(&self, id: i64) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn set_role(&self, id: i64, role: Role) {
        self.users.lock().unwrap().get_mut(&id).unwrap().role = role;
    }

    pub fn deactivate(&self, id: i64) {
        self.users.lock().unwrap().get_mut(&id).unwrap().is_active = false;
    }

    pub fn expire_verification_token(&self, id: i64) {
        self.users
            .lock()
            .unwrap()
            .get_mut(&id)
            .unwrap()
            .email_verification_expires = Some(Utc::now() - Duration::hours(1));
    }

    fn with_user<T>(&self, id: i64, f: impl FnOnce(&mut User) -> T) -> Result<T> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        Ok(f(user))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.get(id))
    }

    async fn insert(&self, new_user: NewUser) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == new_user.email) {
            return Err(Error::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let user = User {
            id,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            phone: new_user.phone,
            company_name: new_user.company_name,
            company_type: new_user.company_type,
            company_role: new_user.company_role,
            address: new_user.address,
            role: Role::Customer,
            email_verified: false,
            email_verification_token: None,
            email_verification_expires: None,
            reset_password_token: None,
            reset_password_expires: None,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn update_last_login(&self, id: i64) -> Result<()> {
        self.with_user(id, |u| u.last_login_at = Some(Utc::now()))
    }

    async fn set_verification_token(
        &self,
        id: i64,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<()> {
        self.with_user(id, |u| {
            u.email_verification_token = Some(token.to_string());
            u.email_verification_expires = Some(expires);
        })
    }

    async fn mark_email_verified(&self, id: i64) -> Result<()> {
        self.with_user(id, |u| {
            u.email_verified = true;
            u.email_verification_token = None;
            u.email_verification_expires = None;
        })
    }

    async fn set_reset_token(&self, id: i64, token: &str, expires: DateTime<Utc>) -> Result<()> {
        self.with_user(id, |u| {
            u.reset_password_token = Some(token.to_string());
            u.reset_password_expires = Some(expires);
        })
    }

    async fn apply_password_reset(&self, id: i64, password_hash: &str) -> Result<()> {
        self.with_user(id, |u| {
            u.password_hash = password_hash.to_string();
            u.reset_password_token = None;
            u.reset_password_expires = None;
            u.email_verified = true;
            u.email_verification_token = None;
            u.email_verification_expires = None;
        })
    }

    async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<()> {
        self.with_user(id, |u| u.password_hash = password_hash.to_string())
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<User> {
        self.with_user(id, |u| {
            if let Some(v) = changes.first_name {
                u.first_name = v;
            }
            if let Some(v) = changes.last_name {
                u.last_name = v;
            }
            if let Some(v) = changes.phone {
                u.phone = Some(v);
            }
            if let Some(v) = changes.company_name {
                u.company_name = v;
            }
            if let Some(v) = changes.company_type {
                u.company_type = v;
            }
            if let Some(v) = changes.company_role {
                u.company_role = v;
            }
            if let Some(v) = changes.address {
                u.address = Some(v);
            }
            u.updated_at = Utc::now();
            u.clone()
        })
    }
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub actor_id: Option<i64>,
    pub action: String,
    pub context: Option<JsonValue>,
}

#[derive(Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingLogger {
    pub fn actions(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.action.clone())
            .collect()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivityLogger for RecordingLogger {
    async fn log(
        &self,
        actor_id: Option<i64>,
        action: &str,
        entity_type: &str,
        entity_id: Option<i64>,
        context: Option<JsonValue>,
    ) -> Result<AuditLog> {
        self.events.lock().unwrap().push(AuditEvent {
            actor_id,
            action: action.to_string(),
            context: context.clone(),
        });
        Ok(AuditLog {
            id: uuid::Uuid::new_v4(),
            actor_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            context,
            created_at: Utc::now(),
        })
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub fail: bool,
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailDispatcher for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Internal("smtp unreachable".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub auth: AuthService,
    pub store: Arc<MemoryUserStore>,
    pub log: Arc<RecordingLogger>,
    pub mail: Arc<RecordingMailer>,
    pub tokens: TokenService,
}

pub fn harness() -> Harness {
    harness_with_mailer(RecordingMailer::default())
}

pub fn harness_with_mailer(mailer: RecordingMailer) -> Harness {
    let auth_config = AuthConfig {
        jwt_secret: "test_secret_key".to_string(),
        bcrypt_cost: 4,
        session_ttl_hours: 24 * 7,
        verification_ttl_hours: 24,
        reset_ttl_hours: 1,
    };
    let store = Arc::new(MemoryUserStore::new());
    let log = Arc::new(RecordingLogger::default());
    let mail = Arc::new(mailer);
    let tokens = TokenService::new(&auth_config);
    let auth = AuthService::new(
        store.clone(),
        log.clone(),
        mail.clone(),
        tokens.clone(),
        PasswordService::new(auth_config.bcrypt_cost),
        "https://shop.example.com".to_string(),
    );
    Harness {
        auth,
        store,
        log,
        mail,
        tokens,
    }
}

/// Lets fire-and-forget audit/email tasks run before asserting on them.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(25)).await;
}

pub fn register_request(email: &str, password: &str) -> storefront_backend::dto::auth_dto::RegisterRequest {
    serde_json::from_value(serde_json::json!({
        "firstName": "Alice",
        "lastName": "Smith",
        "email": email,
        "password": password,
        "phone": "+14155551234",
        "companyName": "Acme Trading",
        "companyType": "retailer",
        "companyRole": "owner"
    }))
    .unwrap()
}
