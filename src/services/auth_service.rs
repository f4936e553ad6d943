use crate::database::user_store::{NewUser, UserStore};
use crate::dto::auth_dto::RegisterRequest;
use crate::dto::user_dto::{ChangePasswordRequest, UpdateProfileRequest};
use crate::error::{Error, Result};
use crate::models::user::{PublicUser, Role, User};
use crate::services::audit_service::ActivityLogger;
use crate::services::email_service::{password_reset_email, verification_email, EmailDispatcher};
use crate::services::password_service::PasswordService;
use crate::services::token_service::{TokenPurpose, TokenService};
use crate::utils::validation::normalize_email;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use validator::{Validate, ValidationError, ValidationErrors};

/// Shared by unknown-email and wrong-password so the two cases cannot be
/// told apart from the response.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

const DEACTIVATED: &str = "This account has been deactivated";
const VERIFICATION_REQUIRED: &str = "Please verify your email address before logging in";
const INVALID_RESET_TOKEN: &str = "Invalid or expired password reset token";
const INVALID_VERIFICATION_TOKEN: &str = "Invalid or expired verification token";
const ALREADY_VERIFIED: &str = "Email address is already verified";

/// Whether this role may log in without a verified email address. Only
/// super admins are exempt; keeping the rule in one place keeps it auditable.
pub fn verification_exempt(role: Role) -> bool {
    matches!(role, Role::SuperAdmin)
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    activity: Arc<dyn ActivityLogger>,
    mailer: Arc<dyn EmailDispatcher>,
    tokens: TokenService,
    passwords: PasswordService,
    app_base_url: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        activity: Arc<dyn ActivityLogger>,
        mailer: Arc<dyn EmailDispatcher>,
        tokens: TokenService,
        passwords: PasswordService,
        app_base_url: String,
    ) -> Self {
        Self {
            store,
            activity,
            mailer,
            tokens,
            passwords,
            app_base_url,
        }
    }

    // Best-effort side effects. Spawned so they never block the response or
    // turn a success into a failure.
    fn audit(&self, actor_id: Option<i64>, action: &str, entity_id: i64, context: Option<JsonValue>) {
        let activity = Arc::clone(&self.activity);
        let action = action.to_string();
        tokio::spawn(async move {
            if let Err(e) = activity
                .log(actor_id, &action, "user", Some(entity_id), context)
                .await
            {
                tracing::warn!(error = %e, action = %action, "audit log write failed");
            }
        });
    }

    fn dispatch_email(&self, to: &str, subject: String, body: String) {
        let mailer = Arc::clone(&self.mailer);
        let to = to.to_string();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, &body).await {
                tracing::warn!(error = %e, recipient = %to, "email dispatch failed");
            }
        });
    }

    fn verification_link(&self, token: &str) -> String {
        format!("{}/verify-email?token={}", self.app_base_url, token)
    }

    fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.app_base_url, token)
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<(PublicUser, String)> {
        req.validate()?;
        let email = normalize_email(&req.email);

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(Error::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let password_hash = self.passwords.hash(&req.password)?;
        let mut user = self
            .store
            .insert(NewUser {
                first_name: req.first_name,
                last_name: req.last_name,
                email,
                password_hash,
                phone: req.phone,
                company_name: req.company_name,
                company_type: req.company_type,
                company_role: req.company_role,
                address: req.address,
            })
            .await?;

        // The registration response carries a usable session token even
        // though the email is not yet verified; only plain login is gated.
        let session = self.tokens.issue(user.id, TokenPurpose::Session)?;
        let verification = self
            .tokens
            .issue(user.id, TokenPurpose::EmailVerification)?;
        let expires = Utc::now() + self.tokens.lifetime(TokenPurpose::EmailVerification);
        self.store
            .set_verification_token(user.id, &verification, expires)
            .await?;
        user.email_verification_token = Some(verification.clone());
        user.email_verification_expires = Some(expires);

        self.audit(
            Some(user.id),
            "user_registered",
            user.id,
            Some(json!({ "email": user.email })),
        );
        let (subject, body) =
            verification_email(&user.first_name, &self.verification_link(&verification));
        self.dispatch_email(&user.email, subject, body);

        Ok((PublicUser::from(user), session))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(PublicUser, String)> {
        let email = normalize_email(email);
        let Some(user) = self.store.find_by_email(&email).await? else {
            return Err(Error::authentication(INVALID_CREDENTIALS));
        };

        if !user.is_active {
            self.audit(
                Some(user.id),
                "login_failed",
                user.id,
                Some(json!({ "reason": "deactivated" })),
            );
            return Err(Error::authentication(DEACTIVATED));
        }

        if !user.email_verified && !verification_exempt(user.role) {
            return Err(Error::requires_verification(VERIFICATION_REQUIRED));
        }

        if !self.passwords.verify(password, &user.password_hash)? {
            self.audit(
                Some(user.id),
                "login_failed",
                user.id,
                Some(json!({ "reason": "bad_password" })),
            );
            return Err(Error::authentication(INVALID_CREDENTIALS));
        }

        self.store.update_last_login(user.id).await?;
        let mut user = user;
        user.last_login_at = Some(Utc::now());

        self.audit(Some(user.id), "user_login", user.id, None);
        let session = self.tokens.issue(user.id, TokenPurpose::Session)?;
        Ok((PublicUser::from(user), session))
    }

    /// Tokens are not revocable server-side; logout exists for the audit
    /// trail only.
    pub async fn logout(&self, user_id: i64) -> Result<()> {
        self.audit(Some(user_id), "user_logout", user_id, None);
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let user = match self.store.find_by_email(&email).await? {
            Some(user) if user.is_active => user,
            _ => {
                return Err(Error::NotFound(
                    "No active account found for this email".to_string(),
                ))
            }
        };

        // Overwrites any outstanding reset token, superseding it.
        let token = self.tokens.issue(user.id, TokenPurpose::PasswordReset)?;
        let expires = Utc::now() + self.tokens.lifetime(TokenPurpose::PasswordReset);
        self.store.set_reset_token(user.id, &token, expires).await?;

        self.audit(Some(user.id), "password_reset_requested", user.id, None);
        let (subject, body) = password_reset_email(&user.first_name, &self.reset_link(&token));
        self.dispatch_email(&user.email, subject, body);
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        validate_password(new_password)?;
        let claims = self
            .tokens
            .verify(token, TokenPurpose::PasswordReset)
            .map_err(|_| Error::Token(INVALID_RESET_TOKEN.to_string()))?;

        let Some(user) = self.store.find_by_id(claims.sub).await? else {
            return Err(Error::Token(INVALID_RESET_TOKEN.to_string()));
        };

        // The signature alone is not enough: a later forgot-password call
        // supersedes this token by overwriting the stored copy.
        if !stored_token_valid(
            user.reset_password_token.as_deref(),
            user.reset_password_expires,
            token,
        ) {
            return Err(Error::Token(INVALID_RESET_TOKEN.to_string()));
        }

        let password_hash = self.passwords.hash(new_password)?;
        self.store
            .apply_password_reset(user.id, &password_hash)
            .await?;

        self.audit(Some(user.id), "password_reset", user.id, None);
        Ok(())
    }

    pub async fn verify_email(&self, token: &str) -> Result<()> {
        let claims = self
            .tokens
            .verify(token, TokenPurpose::EmailVerification)
            .map_err(|_| Error::Token(INVALID_VERIFICATION_TOKEN.to_string()))?;

        let Some(user) = self.store.find_by_id(claims.sub).await? else {
            return Err(Error::Token(INVALID_VERIFICATION_TOKEN.to_string()));
        };

        if user.email_verified {
            return Err(Error::AlreadyVerified(ALREADY_VERIFIED.to_string()));
        }

        if !stored_token_valid(
            user.email_verification_token.as_deref(),
            user.email_verification_expires,
            token,
        ) {
            return Err(Error::Token(INVALID_VERIFICATION_TOKEN.to_string()));
        }

        self.store.mark_email_verified(user.id).await?;
        self.audit(Some(user.id), "email_verified", user.id, None);
        Ok(())
    }

    pub async fn resend_verification(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let user = match self.store.find_by_email(&email).await? {
            Some(user) if user.is_active => user,
            _ => {
                return Err(Error::NotFound(
                    "No active account found for this email".to_string(),
                ))
            }
        };

        if user.email_verified {
            return Err(Error::AlreadyVerified(ALREADY_VERIFIED.to_string()));
        }

        let token = self
            .tokens
            .issue(user.id, TokenPurpose::EmailVerification)?;
        let expires = Utc::now() + self.tokens.lifetime(TokenPurpose::EmailVerification);
        self.store
            .set_verification_token(user.id, &token, expires)
            .await?;

        let (subject, body) = verification_email(&user.first_name, &self.verification_link(&token));
        self.dispatch_email(&user.email, subject, body);
        Ok(())
    }

    pub async fn get_profile(&self, user_id: i64) -> Result<PublicUser> {
        let user = self.require_user(user_id).await?;
        Ok(PublicUser::from(user))
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        req: UpdateProfileRequest,
    ) -> Result<PublicUser> {
        req.validate()?;
        let changes = req.into_changes();
        if changes.is_empty() {
            let mut errors = ValidationErrors::new();
            let mut err = ValidationError::new("empty_update");
            err.message = Some("at least one updatable field must be provided".into());
            errors.add("fields", err);
            return Err(Error::Validation(errors));
        }

        self.require_user(user_id).await?;
        let fields = changes.changed_fields();
        let user = self.store.update_profile(user_id, changes).await?;

        self.audit(
            Some(user_id),
            "profile_updated",
            user_id,
            Some(json!({ "fields": fields })),
        );
        Ok(PublicUser::from(user))
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        req: ChangePasswordRequest,
    ) -> Result<()> {
        req.validate()?;
        let user = self.require_user(user_id).await?;

        if !self
            .passwords
            .verify(&req.current_password, &user.password_hash)?
        {
            return Err(Error::authentication("Current password is incorrect"));
        }

        let password_hash = self.passwords.hash(&req.new_password)?;
        self.store.set_password_hash(user_id, &password_hash).await?;

        self.audit(Some(user_id), "password_changed", user_id, None);
        Ok(())
    }

    async fn require_user(&self, user_id: i64) -> Result<User> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }
}

fn stored_token_valid(
    stored: Option<&str>,
    expires: Option<chrono::DateTime<Utc>>,
    presented: &str,
) -> bool {
    match (stored, expires) {
        (Some(stored), Some(expires)) => stored == presented && expires > Utc::now(),
        _ => false,
    }
}

fn validate_password(password: &str) -> Result<()> {
    if password.len() < 6 {
        let mut errors = ValidationErrors::new();
        let mut err = ValidationError::new("length");
        err.message = Some("must be at least 6 characters".into());
        errors.add("newPassword", err);
        return Err(Error::Validation(errors));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn only_super_admin_is_verification_exempt() {
        assert!(verification_exempt(Role::SuperAdmin));
        assert!(!verification_exempt(Role::Admin));
        assert!(!verification_exempt(Role::Customer));
    }

    #[test]
    fn stored_token_checks_match_and_expiry() {
        let future = Some(Utc::now() + Duration::hours(1));
        let past = Some(Utc::now() - Duration::hours(1));
        assert!(stored_token_valid(Some("t"), future, "t"));
        assert!(!stored_token_valid(Some("t"), past, "t"));
        assert!(!stored_token_valid(Some("other"), future, "t"));
        assert!(!stored_token_valid(None, None, "t"));
    }
}
