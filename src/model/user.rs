//! User account model

use crate::config::PasswordPolicy;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

// bcrypt minimum cost; hashes are only compared locally, never exported
const HASH_COST: u32 = 4;

/// A user account. The plaintext password is transient: it is accepted on
/// input, hashed by [`User::prepare`] and never serialized back out once
/// sanitized.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct User {
    #[serde(default)]
    pub id: u64,

    #[serde(default)]
    pub login: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    #[serde(skip)]
    pub encrypted_password: String,
}

impl User {
    pub fn new(login: impl Into<String>, name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: 0,
            login: login.into(),
            name: name.into(),
            password: password.into(),
            encrypted_password: String::new(),
        }
    }

    /// Validate the account fields. A plaintext password is required unless
    /// a hash is already present, and must match the configured policy.
    pub fn validate(&self, policy: &PasswordPolicy) -> Result<()> {
        if self.login.is_empty() {
            return Err(Error::Validation("login is required".into()));
        }
        if self.name.is_empty() {
            return Err(Error::Validation("name is required".into()));
        }
        if self.encrypted_password.is_empty() && self.password.is_empty() {
            return Err(Error::Validation("password is required".into()));
        }
        if !self.password.is_empty() && !policy.matches(&self.password) {
            return Err(Error::Validation(policy.message.clone()));
        }

        Ok(())
    }

    /// Trim fields and hash the plaintext password. With `sanitize` the
    /// plaintext is cleared after the hash is computed.
    pub fn prepare(&mut self, sanitize: bool) -> Result<()> {
        self.login = self.login.trim().to_string();
        self.name = self.name.trim().to_string();
        self.password = self.password.trim().to_string();

        if !self.password.is_empty() {
            self.encrypted_password = bcrypt::hash(&self.password, HASH_COST)
                .map_err(|e| Error::Internal(format!("password hash error: {}", e)))?;
        }

        if sanitize {
            self.password.clear();
        }

        Ok(())
    }

    /// Check a plaintext password against the stored hash
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.encrypted_password).unwrap_or(false)
    }
}
