use crate::error::{Error, Result};

/// bcrypt wrapper. The cost factor comes from configuration; verification is
/// constant-time by construction of the algorithm.
#[derive(Debug, Clone, Copy)]
pub struct PasswordService {
    cost: u32,
}

impl PasswordService {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plain: &str) -> Result<String> {
        bcrypt::hash(plain, self.cost)
            .map_err(|e| Error::Internal(format!("failed to hash password: {}", e)))
    }

    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool> {
        bcrypt::verify(plain, hash)
            .map_err(|e| Error::Internal(format!("failed to verify password: {}", e)))
    }
}
