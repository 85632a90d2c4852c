//! Configuration schema definitions

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logs: LogConfig,

    #[serde(default)]
    pub password: PasswordConfig,
}

/// Server configuration for the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// The reserved admin identity. Synthesized at runtime, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_id")]
    pub id: u64,

    #[serde(default = "default_admin_login")]
    pub login: String,

    #[serde(default = "default_admin_password")]
    pub password: String,
}

fn default_admin_id() -> u64 {
    1
}

fn default_admin_login() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "admin".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            id: default_admin_id(),
            login: default_admin_login(),
            password: default_admin_password(),
        }
    }
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Key used to sign session cookies
    #[serde(default = "default_session_key")]
    pub key: String,

    /// Session lifetime in seconds
    #[serde(default = "default_session_age")]
    pub max_age_secs: i64,
}

fn default_session_key() -> String {
    "e09469b1507d0e7a98831750aff903e0831a428f9addf3cfa348fa64dcf".to_string()
}

fn default_session_age() -> i64 {
    60 * 60 * 24
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key: default_session_key(),
            max_age_secs: default_session_age(),
        }
    }
}

/// PostgreSQL connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_database_url() -> String {
    "postgres://localhost/log".to_string()
}

fn default_max_connections() -> u32 {
    50
}

fn default_idle_timeout() -> u64 {
    50
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

/// Log query limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Absolute cap on the number of records a single query may match
    #[serde(default = "default_max_records")]
    pub max_records: u64,
}

fn default_max_records() -> u64 {
    100_000
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
        }
    }
}

/// Password policy for user accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    #[serde(default = "default_password_regex")]
    pub regex: String,

    #[serde(default = "default_password_error")]
    pub regex_error: String,
}

fn default_password_regex() -> String {
    "^[A-Za-z0-9@$!%*?&]{4,}$".to_string()
}

fn default_password_error() -> String {
    "Latin letters, digits and @$!%*?& symbols, no spaces, at least 4 characters".to_string()
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            regex: default_password_regex(),
            regex_error: default_password_error(),
        }
    }
}

/// Compiled password policy, built once from [`PasswordConfig`]
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub regex: Regex,
    pub message: String,
}

impl PasswordPolicy {
    pub fn matches(&self, password: &str) -> bool {
        self.regex.is_match(password)
    }
}

impl Config {
    /// Compile the password policy regex
    pub fn password_policy(&self) -> Result<PasswordPolicy> {
        let regex = Regex::new(&self.password.regex)
            .map_err(|e| Error::Config(format!("invalid password regex: {}", e)))?;
        Ok(PasswordPolicy {
            regex,
            message: self.password.regex_error.clone(),
        })
    }
}
