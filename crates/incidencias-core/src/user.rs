//! User accounts.
//!
//! [`User`] is the stored record, password included. Everything that leaves
//! the server is a [`UserInfo`], which has no password field at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credential::Credential;

/// What an account is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  User,
}

/// A stored account.
#[derive(Debug, Clone)]
pub struct User {
  pub id:         Uuid,
  pub username:   String,
  /// Stored password value; interpret it through [`User::credential`].
  pub password:   String,
  pub name:       String,
  pub role:       Role,
  pub created_at: DateTime<Utc>,
}

impl User {
  /// Build a fresh account with a new id. `password` must already be in its
  /// stored form (see [`crate::credential::hash_password`]).
  pub fn new(username: String, password: String, name: String, role: Role) -> Self {
    Self {
      id: Uuid::new_v4(),
      username,
      password,
      name,
      role,
      created_at: Utc::now(),
    }
  }

  pub fn credential(&self) -> Credential<'_> { Credential::classify(&self.password) }

  pub fn info(&self) -> UserInfo {
    UserInfo {
      id:         self.id,
      username:   self.username.clone(),
      name:       self.name.clone(),
      role:       self.role,
      created_at: self.created_at,
    }
  }
}

/// The public view of a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
  pub id:         Uuid,
  pub username:   String,
  pub name:       String,
  pub role:       Role,
  pub created_at: DateTime<Utc>,
}

impl UserInfo {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}
