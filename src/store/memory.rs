//! In-memory store implementation
//!
//! Backs the same contracts as the PostgreSQL store with mutex-guarded
//! maps. Monotonic ID counters live inside the lock; readers may run
//! concurrently, writers are exclusive.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{cap_results, FoundUser, LogStore, ReservedAdmin, UserStore};
use crate::config::PasswordPolicy;
use crate::error::{Error, Result};
use crate::model::{LogRecord, User};

/// In-memory user store
pub struct MemoryUserStore {
    admin: ReservedAdmin,
    policy: PasswordPolicy,
    inner: RwLock<UserMap>,
}

struct UserMap {
    next_id: u64,
    users: HashMap<u64, User>,
}

impl MemoryUserStore {
    pub fn new(admin: ReservedAdmin, policy: PasswordPolicy) -> Self {
        let next_id = admin.id() + 1;
        Self {
            admin,
            policy,
            inner: RwLock::new(UserMap {
                next_id,
                users: HashMap::new(),
            }),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &mut User) -> Result<()> {
        if self.admin.matches_id(user.id) || self.admin.matches_login(&user.login) {
            return Err(Error::AdminProtected);
        }

        user.prepare(true)?;
        user.validate(&self.policy)?;

        let mut map = self.inner.write().await;
        if map.users.values().any(|u| u.login == user.login) {
            return Err(Error::LoginExists(user.login.clone()));
        }

        user.id = map.next_id;
        map.next_id += 1;
        map.users.insert(user.id, user.clone());

        Ok(())
    }

    async fn change_password(&self, user_id: u64, password: &str) -> Result<()> {
        if self.admin.matches_id(user_id) {
            return Err(Error::AdminProtected);
        }

        let mut map = self.inner.write().await;
        let user = map.users.get_mut(&user_id).ok_or(Error::UserNotFound)?;

        let mut updated = user.clone();
        updated.password = password.trim().to_string();
        updated.validate(&self.policy)?;
        updated.prepare(true)?;

        *user = updated;

        Ok(())
    }

    async fn find_by_id(&self, user_id: u64) -> Result<Option<FoundUser>> {
        if self.admin.matches_id(user_id) {
            return Ok(Some(self.admin.found()));
        }

        let map = self.inner.read().await;
        Ok(map.users.get(&user_id).cloned().map(FoundUser::Regular))
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<FoundUser>> {
        if self.admin.matches_login(login) {
            return Ok(Some(self.admin.found()));
        }

        let map = self.inner.read().await;
        Ok(map
            .users
            .values()
            .find(|u| u.login == login)
            .cloned()
            .map(FoundUser::Regular))
    }

    async fn get_users(&self) -> Result<Vec<User>> {
        let map = self.inner.read().await;
        let mut users: Vec<_> = map.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn remove(&self, user_id: u64) -> Result<()> {
        if self.admin.matches_id(user_id) {
            return Err(Error::AdminProtected);
        }

        let mut map = self.inner.write().await;
        map.users.remove(&user_id).ok_or(Error::UserNotFound)?;
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        if self.admin.matches_id(user.id) || self.admin.matches_login(&user.login) {
            return Err(Error::AdminProtected);
        }

        let mut map = self.inner.write().await;
        let existing = map.users.get_mut(&user.id).ok_or(Error::UserNotFound)?;
        *existing = user.clone();
        Ok(())
    }
}

/// In-memory log store
pub struct MemoryLogStore {
    max_records: u64,
    inner: RwLock<LogMap>,
}

struct LogMap {
    next_id: u64,
    records: HashMap<u64, LogRecord>,
}

impl MemoryLogStore {
    pub fn new(max_records: u64) -> Self {
        Self {
            max_records,
            inner: RwLock::new(LogMap {
                next_id: 1,
                records: HashMap::new(),
            }),
        }
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn insert(&self, records: &[LogRecord]) -> Result<()> {
        for record in records {
            record.validate()?;
        }

        let now = Utc::now();
        let mut map = self.inner.write().await;
        for record in records {
            let mut stored = record.clone();
            stored.id = map.next_id;
            stored.real_time = Some(now);
            map.next_id += 1;
            map.records.insert(stored.id, stored);
        }

        Ok(())
    }

    async fn find(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: u64,
    ) -> Result<(Vec<LogRecord>, bool)> {
        let mut matches = Vec::new();

        {
            let map = self.inner.read().await;
            for record in map.records.values() {
                let Some(log_time) = record.log_time else {
                    continue;
                };
                if from.is_some_and(|f| log_time < f) {
                    continue;
                }
                if to.is_some_and(|t| log_time > t) {
                    continue;
                }
                matches.push(record.clone());
            }
        }

        // newest first, same order as the SQL store
        matches.sort_by(|a, b| b.log_time.cmp(&a.log_time));

        cap_results(matches, limit, self.max_records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdminConfig, Config};
    use chrono::TimeZone;

    fn user_store() -> MemoryUserStore {
        let admin = ReservedAdmin::synthesize(&AdminConfig::default()).unwrap();
        let policy = Config::default().password_policy().unwrap();
        MemoryUserStore::new(admin, policy)
    }

    fn record(time: DateTime<Utc>, message: &str) -> LogRecord {
        LogRecord {
            log_time: Some(time),
            level: 2,
            message1: message.to_string(),
            ..Default::default()
        }
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_strips_plaintext() {
        let store = user_store();
        let mut user = User::new("alice", "Alice", "Qw!12345");
        store.insert(&mut user).await.unwrap();

        assert_eq!(user.id, 2);
        assert!(user.password.is_empty());
        assert!(!user.encrypted_password.is_empty());

        let found = store.find_by_login("alice").await.unwrap().unwrap();
        assert!(!found.is_reserved_admin());
        assert!(found.user().verify_password("Qw!12345"));
    }

    #[tokio::test]
    async fn test_insert_rejects_admin_collision() {
        let store = user_store();

        let mut user = User::new("Admin", "Imposter", "Qw!12345");
        assert!(matches!(
            store.insert(&mut user).await,
            Err(Error::AdminProtected)
        ));

        let mut user = User::new("alice", "Alice", "Qw!12345");
        user.id = 1;
        assert!(matches!(
            store.insert(&mut user).await,
            Err(Error::AdminProtected)
        ));
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_login() {
        let store = user_store();

        let mut first = User::new("alice", "Alice", "Qw!12345");
        store.insert(&mut first).await.unwrap();

        let mut second = User::new("alice", "Another Alice", "Qw!12345");
        assert!(matches!(
            store.insert(&mut second).await,
            Err(Error::LoginExists(_))
        ));
    }

    #[tokio::test]
    async fn test_find_resolves_reserved_admin() {
        let store = user_store();

        let by_id = store.find_by_id(1).await.unwrap().unwrap();
        assert!(by_id.is_reserved_admin());

        let by_login = store.find_by_login("ADMIN").await.unwrap().unwrap();
        assert!(by_login.is_reserved_admin());

        assert!(store.find_by_id(42).await.unwrap().is_none());
        assert!(store.find_by_login("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_users_excludes_admin() {
        let store = user_store();

        let mut alice = User::new("alice", "Alice", "Qw!12345");
        let mut bob = User::new("bob", "Bob", "Qw!12345");
        store.insert(&mut alice).await.unwrap();
        store.insert(&mut bob).await.unwrap();

        let users = store.get_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.login != "admin"));
    }

    #[tokio::test]
    async fn test_change_password() {
        let store = user_store();

        let mut user = User::new("alice", "Alice", "Qw!12345");
        store.insert(&mut user).await.unwrap();

        store.change_password(user.id, "NewPass99").await.unwrap();
        let found = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(found.user().verify_password("NewPass99"));
        assert!(!found.user().verify_password("Qw!12345"));

        assert!(matches!(
            store.change_password(1, "NewPass99").await,
            Err(Error::AdminProtected)
        ));
        assert!(matches!(
            store.change_password(777, "NewPass99").await,
            Err(Error::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_remove_and_update() {
        let store = user_store();

        let mut user = User::new("alice", "Alice", "Qw!12345");
        store.insert(&mut user).await.unwrap();

        let mut renamed = user.clone();
        renamed.name = "Alice B".to_string();
        store.update(&renamed).await.unwrap();
        let found = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.user().name, "Alice B");

        store.remove(user.id).await.unwrap();
        assert!(store.find_by_id(user.id).await.unwrap().is_none());
        assert!(matches!(
            store.remove(user.id).await,
            Err(Error::UserNotFound)
        ));
        assert!(matches!(store.remove(1).await, Err(Error::AdminProtected)));
    }

    #[tokio::test]
    async fn test_log_insert_validates_whole_batch() {
        let store = MemoryLogStore::new(100);

        let bad_batch = vec![record(ts(100), "ok"), LogRecord::default()];
        assert!(store.insert(&bad_batch).await.is_err());

        // nothing from the failed batch was stored
        let (records, _) = store.find(None, None, 100).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_log_insert_stamps_receipt_time_and_ids() {
        let store = MemoryLogStore::new(100);
        store
            .insert(&[record(ts(100), "one"), record(ts(200), "two")])
            .await
            .unwrap();

        let (records, limited) = store.find(None, None, 100).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(!limited);
        assert!(records.iter().all(|r| r.id != 0));
        assert!(records.iter().all(|r| r.real_time.is_some()));
    }

    #[tokio::test]
    async fn test_find_orders_newest_first() {
        let store = MemoryLogStore::new(100);
        store
            .insert(&[
                record(ts(100), "old"),
                record(ts(300), "new"),
                record(ts(200), "mid"),
            ])
            .await
            .unwrap();

        let (records, _) = store.find(None, None, 100).await.unwrap();
        let messages: Vec<_> = records.iter().map(|r| r.message1.as_str()).collect();
        assert_eq!(messages, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_find_time_bounds_inclusive() {
        let store = MemoryLogStore::new(100);
        store
            .insert(&[
                record(ts(100), "a"),
                record(ts(200), "b"),
                record(ts(300), "c"),
            ])
            .await
            .unwrap();

        let (records, _) = store
            .find(Some(ts(100)), Some(ts(200)), 100)
            .await
            .unwrap();
        assert_eq!(records.len(), 2);

        let (records, _) = store.find(Some(ts(201)), None, 100).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message1, "c");

        let (records, _) = store.find(None, Some(ts(99)), 100).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_find_limit_and_flag() {
        let store = MemoryLogStore::new(100);
        let batch: Vec<_> = (1..=5).map(|i| record(ts(i * 100), "m")).collect();
        store.insert(&batch).await.unwrap();

        let (records, limited) = store.find(None, None, 5).await.unwrap();
        assert_eq!(records.len(), 5);
        assert!(!limited);

        let (records, limited) = store.find(None, None, 3).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(limited);
    }

    #[tokio::test]
    async fn test_find_server_cap() {
        let store = MemoryLogStore::new(4);
        let batch: Vec<_> = (1..=5).map(|i| record(ts(i * 100), "m")).collect();
        store.insert(&batch).await.unwrap();

        assert!(matches!(
            store.find(None, None, 100).await,
            Err(Error::TooManyRecords(4))
        ));
    }
}
