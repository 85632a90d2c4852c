//! User business operations

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::User;
use crate::store::{FoundUser, UserStore};

/// Orchestrates user operations over whichever store backend was chosen
/// at startup. Business rules live here; the store only persists.
#[derive(Clone)]
pub struct UserUsecase {
    store: Arc<dyn UserStore>,
}

impl UserUsecase {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Verify credentials and return the user ID on success
    pub async fn check_password(&self, login: &str, password: &str) -> Result<u64> {
        let found = self
            .store
            .find_by_login(login)
            .await?
            .ok_or(Error::InvalidCredentials)?;

        if !found.user().verify_password(password) {
            return Err(Error::InvalidCredentials);
        }

        Ok(found.id())
    }

    /// Change a password. Everyone may change their own; only the reserved
    /// admin may change somebody else's.
    pub async fn change_password(
        &self,
        current: &FoundUser,
        login: &str,
        password: &str,
    ) -> Result<u64> {
        let login = login.trim();
        let password = password.trim();

        let target_id = if current.login() == login {
            current.id()
        } else {
            if !current.is_reserved_admin() {
                return Err(Error::NotAdmin);
            }

            self.store
                .find_by_login(login)
                .await?
                .ok_or(Error::UserNotFound)?
                .id()
        };

        self.store.change_password(target_id, password).await?;
        Ok(target_id)
    }

    pub async fn insert(&self, user: &mut User) -> Result<()> {
        self.store.insert(user).await
    }

    pub async fn remove(&self, user_id: u64) -> Result<()> {
        self.store.remove(user_id).await
    }

    pub async fn update(&self, user: &User) -> Result<()> {
        self.store.update(user).await
    }

    pub async fn find_by_id(&self, user_id: u64) -> Result<Option<FoundUser>> {
        self.store.find_by_id(user_id).await
    }

    pub async fn find_by_login(&self, login: &str) -> Result<Option<FoundUser>> {
        self.store.find_by_login(login).await
    }

    pub async fn get_users(&self) -> Result<Vec<User>> {
        self.store.get_users().await
    }
}
