pub mod audit_service;
pub mod auth_service;
pub mod email_service;
pub mod password_service;
pub mod token_service;
