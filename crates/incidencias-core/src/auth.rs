//! Authentication: login, registration and the principal of mutating calls.
//!
//! There are no session tokens. A client keeps the [`UserInfo`] returned by
//! `login` and proves itself again on every mutating request; the HTTP layer
//! turns those credentials into a [`Principal`] via
//! [`AuthService::authenticate`].

use std::sync::Arc;

use uuid::Uuid;

use crate::{
  Error, Result,
  credential::hash_password,
  incident::Incident,
  store::IncidentStore,
  user::{Role, User, UserInfo},
};

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
  pub id:       Uuid,
  pub username: String,
  pub role:     Role,
}

impl Principal {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }

  /// Admins may delete anything; everyone else only what they created.
  pub fn may_delete(&self, incident: &Incident) -> bool {
    self.is_admin() || incident.user_id == Some(self.id)
  }
}

impl From<&UserInfo> for Principal {
  fn from(info: &UserInfo) -> Self {
    Self {
      id:       info.id,
      username: info.username.clone(),
      role:     info.role,
    }
  }
}

/// Login, registration and admin seeding over an [`IncidentStore`].
pub struct AuthService<S> {
  store: Arc<S>,
}

impl<S> Clone for AuthService<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: IncidentStore> AuthService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Check `password` for `username` and return the account.
  ///
  /// Unknown users and wrong passwords fail the same way.
  pub async fn login(&self, username: &str, password: &str) -> Result<UserInfo> {
    let user = self
      .store
      .find_user(username)
      .await
      .map_err(Error::store)?
      .ok_or(Error::Unauthorized)?;

    let credential = user.credential();
    if !credential.verify(password) {
      tracing::debug!(username, "password mismatch");
      return Err(Error::Unauthorized);
    }
    if !credential.is_hashed() {
      tracing::warn!(username, "account still uses a plaintext password");
    }
    Ok(user.info())
  }

  /// [`login`](Self::login), reduced to what authorization needs.
  pub async fn authenticate(&self, username: &str, password: &str) -> Result<Principal> {
    self.login(username, password).await.map(|info| Principal::from(&info))
  }

  /// Create a `user` account. Fails with [`Error::UsernameTaken`] when the
  /// store's unique constraint rejects the username.
  pub async fn register(&self, username: &str, password: &str, name: &str) -> Result<UserInfo> {
    self.create(username, password, name, Role::User).await?.ok_or_else(|| {
      tracing::debug!(username, "registration rejected: username taken");
      Error::UsernameTaken(username.to_owned())
    })
  }

  /// Make sure an `admin` account named `username` exists.
  ///
  /// An existing account is returned untouched, whatever its role and
  /// password.
  pub async fn seed_admin(&self, username: &str, password: &str, name: &str) -> Result<UserInfo> {
    if let Some(user) = self.create(username, password, name, Role::Admin).await? {
      tracing::info!(username, "admin account created");
      return Ok(user);
    }
    let existing = self
      .store
      .find_user(username)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::UsernameTaken(username.to_owned()))?;
    tracing::info!(username, "admin account already present");
    Ok(existing.info())
  }

  async fn create(
    &self,
    username: &str,
    password: &str,
    name: &str,
    role: Role,
  ) -> Result<Option<UserInfo>> {
    if username.trim().is_empty() {
      return Err(Error::BadRequest("username must not be empty".into()));
    }
    if password.is_empty() {
      return Err(Error::BadRequest("password must not be empty".into()));
    }

    let user = User::new(username.to_owned(), hash_password(password)?, name.to_owned(), role);
    let stored = self.store.insert_user(user).await.map_err(Error::store)?;
    Ok(stored.map(|u| u.info()))
  }
}
