//! PostgreSQL store implementation

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use super::{cap_results, FoundUser, LogStore, ReservedAdmin, UserStore};
use crate::config::{DatabaseConfig, PasswordPolicy};
use crate::error::{Error, Result};
use crate::model::{LogRecord, User};

/// Open a connection pool with the configured limits
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!("connected to database");
    Ok(pool)
}

/// PostgreSQL-backed user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
    admin: ReservedAdmin,
    policy: PasswordPolicy,
}

impl PgUserStore {
    pub fn new(pool: PgPool, admin: ReservedAdmin, policy: PasswordPolicy) -> Self {
        Self {
            pool,
            admin,
            policy,
        }
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let id: i64 = row.try_get("id")?;
    Ok(User {
        id: id as u64,
        login: row.try_get("login")?,
        name: row.try_get("name")?,
        password: String::new(),
        encrypted_password: row.try_get("encrypted_password")?,
    })
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &mut User) -> Result<()> {
        if self.admin.matches_id(user.id) || self.admin.matches_login(&user.login) {
            return Err(Error::AdminProtected);
        }

        user.prepare(true)?;
        user.validate(&self.policy)?;

        let row = sqlx::query(
            "INSERT INTO users (login, name, encrypted_password) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&user.login)
        .bind(&user.name)
        .bind(&user.encrypted_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::LoginExists(user.login.clone())
            }
            _ => Error::Database(e),
        })?;

        let id: i64 = row.try_get("id")?;
        user.id = id as u64;

        Ok(())
    }

    async fn change_password(&self, user_id: u64, password: &str) -> Result<()> {
        if self.admin.matches_id(user_id) {
            return Err(Error::AdminProtected);
        }

        let found = self
            .find_by_id(user_id)
            .await?
            .ok_or(Error::UserNotFound)?;

        let mut user = found.into_user();
        user.password = password.trim().to_string();
        user.validate(&self.policy)?;
        user.prepare(true)?;

        sqlx::query("UPDATE users SET encrypted_password = $1 WHERE id = $2")
            .bind(&user.encrypted_password)
            .bind(user_id as i64)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_by_id(&self, user_id: u64) -> Result<Option<FoundUser>> {
        if self.admin.matches_id(user_id) {
            return Ok(Some(self.admin.found()));
        }

        let row = sqlx::query("SELECT id, login, name, encrypted_password FROM users WHERE id = $1")
            .bind(user_id as i64)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| user_from_row(&r).map(FoundUser::Regular))
            .transpose()
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<FoundUser>> {
        if self.admin.matches_login(login) {
            return Ok(Some(self.admin.found()));
        }

        let row =
            sqlx::query("SELECT id, login, name, encrypted_password FROM users WHERE login = $1")
                .bind(login)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| user_from_row(&r).map(FoundUser::Regular))
            .transpose()
    }

    async fn get_users(&self) -> Result<Vec<User>> {
        let rows =
            sqlx::query("SELECT id, login, name, encrypted_password FROM users ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn remove(&self, _user_id: u64) -> Result<()> {
        Err(Error::NotImplemented)
    }

    async fn update(&self, _user: &User) -> Result<()> {
        Err(Error::NotImplemented)
    }
}

/// PostgreSQL-backed log store
#[derive(Clone)]
pub struct PgLogStore {
    pool: PgPool,
    max_records: u64,
}

impl PgLogStore {
    pub fn new(pool: PgPool, max_records: u64) -> Self {
        Self { pool, max_records }
    }
}

fn record_from_row(row: &PgRow) -> Result<LogRecord> {
    let id: i64 = row.try_get("id")?;
    let level: i32 = row.try_get("level")?;
    Ok(LogRecord {
        id: id as u64,
        log_time: row.try_get("record_timestamp")?,
        real_time: row.try_get("real_timestamp")?,
        level: level as u32,
        message1: row.try_get("message1")?,
        message2: row.try_get("message2")?,
        message3: row.try_get("message3")?,
    })
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn insert(&self, records: &[LogRecord]) -> Result<()> {
        for record in records {
            record.validate()?;
        }

        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                "INSERT INTO log (record_timestamp, real_timestamp, level, message1, message2, message3) \
                 VALUES ($1, now(), $2, $3, $4, $5)",
            )
            .bind(record.log_time)
            .bind(record.level as i32)
            .bind(&record.message1)
            .bind(&record.message2)
            .bind(&record.message3)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn find(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: u64,
    ) -> Result<(Vec<LogRecord>, bool)> {
        // fetch one row past the cap so the overflow check can fire
        let fetch = self.max_records.saturating_add(1);

        let rows = sqlx::query(
            "SELECT id, record_timestamp, real_timestamp, level, message1, message2, message3 \
             FROM log \
             WHERE ($1 OR record_timestamp >= $2) AND ($3 OR record_timestamp <= $4) \
             ORDER BY record_timestamp DESC \
             LIMIT $5",
        )
        .bind(from.is_none())
        .bind(from.unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
        .bind(to.is_none())
        .bind(to.unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
        .bind(fetch as i64)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>>>()?;

        cap_results(records, limit, self.max_records)
    }
}
