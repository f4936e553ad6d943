use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // International format: leading +, country code, 7-15 digits total after it.
    pub static ref PHONE_RE: Regex = Regex::new(r"^\+[1-9]\d{7,14}$").unwrap();
}

/// Emails are matched and stored case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
