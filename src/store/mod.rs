//! Storage backends for users and log records
//!
//! Two interchangeable implementations of the same contracts: a
//! PostgreSQL-backed store and an in-memory store used for tests and
//! single-process deployments. Which one serves a given deployment is
//! decided once at startup.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::AdminConfig;
use crate::error::{Error, Result};
use crate::model::{LogRecord, User};

pub use memory::{MemoryLogStore, MemoryUserStore};
pub use postgres::{PgLogStore, PgUserStore};

/// Result of a user lookup. The reserved admin is synthesized from
/// configuration and never persisted, so lookups distinguish it from
/// regular stored users; the distinction carries through to the
/// authorization checks upstream.
#[derive(Debug, Clone)]
pub enum FoundUser {
    ReservedAdmin(User),
    Regular(User),
}

impl FoundUser {
    pub fn user(&self) -> &User {
        match self {
            FoundUser::ReservedAdmin(user) | FoundUser::Regular(user) => user,
        }
    }

    pub fn into_user(self) -> User {
        match self {
            FoundUser::ReservedAdmin(user) | FoundUser::Regular(user) => user,
        }
    }

    pub fn id(&self) -> u64 {
        self.user().id
    }

    pub fn login(&self) -> &str {
        &self.user().login
    }

    pub fn is_reserved_admin(&self) -> bool {
        matches!(self, FoundUser::ReservedAdmin(_))
    }
}

/// The reserved admin identity, built once from configuration and shared
/// by every store backend. It cannot be inserted, updated, removed or
/// password-changed through the normal paths.
#[derive(Debug, Clone)]
pub struct ReservedAdmin {
    user: User,
}

impl ReservedAdmin {
    pub fn synthesize(config: &AdminConfig) -> Result<Self> {
        let mut user = User::new(config.login.clone(), "admin", config.password.clone());
        user.id = config.id;
        user.prepare(true)?;
        Ok(Self { user })
    }

    pub fn id(&self) -> u64 {
        self.user.id
    }

    pub fn matches_id(&self, id: u64) -> bool {
        id == self.user.id
    }

    pub fn matches_login(&self, login: &str) -> bool {
        login.eq_ignore_ascii_case(&self.user.login)
    }

    pub fn found(&self) -> FoundUser {
        FoundUser::ReservedAdmin(self.user.clone())
    }
}

/// Storage contract for user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Add a new user. The assigned ID is written back into `user`.
    async fn insert(&self, user: &mut User) -> Result<()>;

    /// Replace a user's password hash
    async fn change_password(&self, user_id: u64, password: &str) -> Result<()>;

    async fn find_by_id(&self, user_id: u64) -> Result<Option<FoundUser>>;
    async fn find_by_login(&self, login: &str) -> Result<Option<FoundUser>>;

    /// All non-admin users
    async fn get_users(&self) -> Result<Vec<User>>;

    async fn remove(&self, user_id: u64) -> Result<()>;
    async fn update(&self, user: &User) -> Result<()>;
}

/// Storage contract for log records
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Insert a batch of records. Every record is validated before any
    /// write happens; the batch is all-or-nothing.
    async fn insert(&self, records: &[LogRecord]) -> Result<()>;

    /// Records whose log time falls in `[from, to]` (a `None` bound is
    /// unbounded on that side), newest first, truncated to `limit`. The
    /// returned flag reports whether truncation happened.
    async fn find(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: u64,
    ) -> Result<(Vec<LogRecord>, bool)>;
}

/// Apply the caller limit and the server-side absolute cap to a matched
/// result set. Used by both backends so their truncation semantics stay
/// identical.
pub(crate) fn cap_results(
    mut records: Vec<LogRecord>,
    limit: u64,
    max_records: u64,
) -> Result<(Vec<LogRecord>, bool)> {
    if records.len() as u64 > max_records {
        return Err(Error::TooManyRecords(max_records));
    }

    let limited = records.len() as u64 > limit;
    if limited {
        records.truncate(limit as usize);
    }

    Ok((records, limited))
}
