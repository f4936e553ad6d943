use crate::database::user_store::ProfileChanges;
use crate::models::user::{CompanyRole, CompanyType};
use crate::utils::validation::PHONE_RE;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use validator::Validate;

/// The mutable profile surface, stated as an explicit struct. Fields absent
/// from the request body stay untouched; unknown keys are ignored by serde.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 50, message = "must be 2-50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 50, message = "must be 2-50 characters"))]
    pub last_name: Option<String>,
    #[validate(regex(
        path = *PHONE_RE,
        message = "must be an international number like +14155551234"
    ))]
    pub phone: Option<String>,
    #[validate(length(min = 2, max = 100, message = "must be 2-100 characters"))]
    pub company_name: Option<String>,
    pub company_type: Option<CompanyType>,
    pub company_role: Option<CompanyRole>,
    pub address: Option<JsonValue>,
}

impl UpdateProfileRequest {
    pub fn into_changes(self) -> ProfileChanges {
        ProfileChanges {
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            company_name: self.company_name,
            company_type: self.company_type,
            company_role: self.company_role,
            address: self.address,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_are_ignored_not_rejected() {
        let req: UpdateProfileRequest = serde_json::from_value(serde_json::json!({
            "firstName": "Alicia",
            "role": "super_admin",
            "emailVerified": true,
            "passwordHash": "sneaky"
        }))
        .unwrap();
        let changes = req.into_changes();
        assert_eq!(changes.first_name.as_deref(), Some("Alicia"));
        assert_eq!(changes.changed_fields(), vec!["firstName"]);
    }

    #[test]
    fn empty_body_yields_empty_change_set() {
        let req: UpdateProfileRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(req.into_changes().is_empty());
    }
}
