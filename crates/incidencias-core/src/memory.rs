//! In-memory [`IncidentStore`] for unit tests.

use std::{convert::Infallible, sync::Mutex};

use chrono::{TimeZone as _, Utc};
use uuid::Uuid;

use crate::{
  incident::{Incident, IncidentCode, IncidentPatch, Reporter},
  store::IncidentStore,
  user::User,
};

#[derive(Default)]
pub struct MemoryStore {
  users:     Mutex<Vec<User>>,
  incidents: Mutex<Vec<Incident>>,
}

impl MemoryStore {
  pub fn user(&self, username: &str) -> Option<User> {
    self.users.lock().unwrap().iter().find(|u| u.username == username).cloned()
  }

  /// Insert a user as-is, bypassing hashing.
  pub fn put_user(&self, user: User) { self.users.lock().unwrap().push(user); }

  fn with_reporter(&self, mut incident: Incident) -> Incident {
    incident.posted_by = incident.user_id.and_then(|id| {
      self
        .users
        .lock()
        .unwrap()
        .iter()
        .find(|u| u.id == id)
        .map(|u| Reporter { name: u.name.clone(), username: u.username.clone() })
    });
    incident
  }
}

impl IncidentStore for MemoryStore {
  type Error = Infallible;

  async fn find_user(&self, username: &str) -> Result<Option<User>, Infallible> {
    Ok(self.user(username))
  }

  async fn insert_user(&self, user: User) -> Result<Option<User>, Infallible> {
    let mut users = self.users.lock().unwrap();
    if users.iter().any(|u| u.username == user.username) {
      return Ok(None);
    }
    users.push(user.clone());
    Ok(Some(user))
  }

  async fn list_incidents(&self) -> Result<Vec<Incident>, Infallible> {
    let mut list: Vec<Incident> = self.incidents.lock().unwrap().iter().rev().cloned().collect();
    list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(list.into_iter().map(|i| self.with_reporter(i)).collect())
  }

  async fn get_incident(&self, code: &str) -> Result<Option<Incident>, Infallible> {
    let found = self.incidents.lock().unwrap().iter().find(|i| i.code.as_str() == code).cloned();
    Ok(found.map(|i| self.with_reporter(i)))
  }

  async fn insert_incident(&self, incident: Incident) -> Result<Option<Incident>, Infallible> {
    let mut incidents = self.incidents.lock().unwrap();
    if incidents.iter().any(|i| i.code == incident.code) {
      return Ok(None);
    }
    incidents.push(incident.clone());
    drop(incidents);
    Ok(Some(self.with_reporter(incident)))
  }

  async fn update_incident(
    &self,
    code: &str,
    patch: IncidentPatch,
  ) -> Result<Option<Incident>, Infallible> {
    let updated = {
      let mut incidents = self.incidents.lock().unwrap();
      incidents.iter_mut().find(|i| i.code.as_str() == code).map(|incident| {
        patch.apply(incident);
        incident.clone()
      })
    };
    Ok(updated.map(|i| self.with_reporter(i)))
  }

  async fn delete_incident(&self, code: &str) -> Result<bool, Infallible> {
    let mut incidents = self.incidents.lock().unwrap();
    let before = incidents.len();
    incidents.retain(|i| i.code.as_str() != code);
    Ok(incidents.len() != before)
  }
}

/// Owner of every [`sample_incident`].
pub const SAMPLE_OWNER: Uuid = Uuid::from_u128(0x5a3e_0000_0000_4000_8000_0000_0000_0001);

/// A minimal, deterministic incident for filter and aggregation tests.
pub fn sample_incident(code: &str, kind: &str, status: &str) -> Incident {
  let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
  Incident {
    code:            IncidentCode::from_stored(code.to_owned()),
    name:            format!("Incidente {code}"),
    kind:            kind.to_owned(),
    status:          status.to_owned(),
    location:        "Lima".to_owned(),
    description:     None,
    reported_by:     "Vecino".to_owned(),
    lat:             None,
    lng:             None,
    image_url:       None,
    timestamp:       now,
    occurrence_time: now,
    user_id:         Some(SAMPLE_OWNER),
    created_at:      now,
    posted_by:       None,
  }
}
