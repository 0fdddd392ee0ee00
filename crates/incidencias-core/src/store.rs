//! The `IncidentStore` trait.
//!
//! Implemented by storage backends (e.g. `incidencias-store-sqlite`). The
//! services in this crate depend on the abstraction only.
//!
//! Uniqueness of usernames and incident codes is the backend's job and must
//! be enforced by the storage engine itself (a `UNIQUE` constraint), never by
//! a lookup followed by an insert.

use std::future::Future;

use crate::{
  incident::{Incident, IncidentPatch},
  user::User,
};

/// Abstraction over the credential and incident tables.
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers on a multi-threaded runtime.
pub trait IncidentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Look a user up by username. Returns `None` if absent.
  fn find_user<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Persist a new user. Returns `None` if the username is already taken.
  fn insert_user(
    &self,
    user: User,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Incidents ─────────────────────────────────────────────────────────

  /// All incidents, most recently created first, with `posted_by` filled in
  /// when the creating user still resolves.
  fn list_incidents(
    &self,
  ) -> impl Future<Output = Result<Vec<Incident>, Self::Error>> + Send + '_;

  /// A single incident by code, with `posted_by` filled in.
  fn get_incident<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<Incident>, Self::Error>> + Send + 'a;

  /// Persist a new incident and return it as [`get_incident`] would, with
  /// `posted_by` filled in. Returns `None` if the code is already taken;
  /// the existing record is left as it was.
  ///
  /// [`get_incident`]: IncidentStore::get_incident
  fn insert_incident(
    &self,
    incident: Incident,
  ) -> impl Future<Output = Result<Option<Incident>, Self::Error>> + Send + '_;

  /// Apply `patch` to the incident with `code` and return the result.
  /// Returns `None` if no such incident exists.
  fn update_incident<'a>(
    &'a self,
    code: &'a str,
    patch: IncidentPatch,
  ) -> impl Future<Output = Result<Option<Incident>, Self::Error>> + Send + 'a;

  /// Delete the incident with `code`. Returns `false` if it did not exist.
  fn delete_incident<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
