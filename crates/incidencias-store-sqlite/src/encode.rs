//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with microsecond precision and a
//! `Z` suffix, so lexical order is chronological order. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use incidencias_core::{
  incident::{Incident, IncidentCode, Reporter},
  user::{Role, User},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_role(role: Role) -> &'static str {
  match role {
    Role::Admin => "admin",
    Role::User => "user",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "admin" => Ok(Role::Admin),
    "user" => Ok(Role::User),
    other => Err(Error::UnknownRole(other.to_owned())),
  }
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Column order of [`USER_COLUMNS`].
pub struct RawUser {
  pub user_id:    String,
  pub username:   String,
  pub password:   String,
  pub name:       String,
  pub role:       String,
  pub created_at: String,
}

pub const USER_COLUMNS: &str = "user_id, username, password, name, role, created_at";

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      username:   row.get(1)?,
      password:   row.get(2)?,
      name:       row.get(3)?,
      role:       row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:         decode_uuid(&self.user_id)?,
      username:   self.username,
      password:   self.password,
      name:       self.name,
      role:       decode_role(&self.role)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Column order of [`INCIDENT_SELECT`].
pub struct RawIncident {
  pub code:              String,
  pub name:              String,
  pub kind:              String,
  pub status:            String,
  pub location:          String,
  pub description:       Option<String>,
  pub reported_by:       String,
  pub lat:               Option<f64>,
  pub lng:               Option<f64>,
  pub image_url:         Option<String>,
  pub timestamp:         String,
  pub occurrence_time:   String,
  pub user_id:           Option<String>,
  pub created_at:        String,
  pub reporter_name:     Option<String>,
  pub reporter_username: Option<String>,
}

/// Incidents joined with the display data of their creator.
pub const INCIDENT_SELECT: &str = "
SELECT i.code, i.name, i.kind, i.status, i.location, i.description,
       i.reported_by, i.lat, i.lng, i.image_url,
       i.timestamp, i.occurrence_time, i.user_id, i.created_at,
       u.name, u.username
FROM incidents i
LEFT JOIN users u ON u.user_id = i.user_id";

impl RawIncident {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      code:              row.get(0)?,
      name:              row.get(1)?,
      kind:              row.get(2)?,
      status:            row.get(3)?,
      location:          row.get(4)?,
      description:       row.get(5)?,
      reported_by:       row.get(6)?,
      lat:               row.get(7)?,
      lng:               row.get(8)?,
      image_url:         row.get(9)?,
      timestamp:         row.get(10)?,
      occurrence_time:   row.get(11)?,
      user_id:           row.get(12)?,
      created_at:        row.get(13)?,
      reporter_name:     row.get(14)?,
      reporter_username: row.get(15)?,
    })
  }

  pub fn into_incident(self) -> Result<Incident> {
    let posted_by = match (self.reporter_name, self.reporter_username) {
      (Some(name), Some(username)) => Some(Reporter { name, username }),
      _ => None,
    };
    Ok(Incident {
      code: IncidentCode::from_stored(self.code),
      name: self.name,
      kind: self.kind,
      status: self.status,
      location: self.location,
      description: self.description,
      reported_by: self.reported_by,
      lat: self.lat,
      lng: self.lng,
      image_url: self.image_url,
      timestamp: decode_dt(&self.timestamp)?,
      occurrence_time: decode_dt(&self.occurrence_time)?,
      user_id: self.user_id.as_deref().map(decode_uuid).transpose()?,
      created_at: decode_dt(&self.created_at)?,
      posted_by,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn stored_timestamps_sort_lexically() {
    let a = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let b = a + chrono::Duration::microseconds(1);
    let c = a + chrono::Duration::seconds(1);
    assert!(encode_dt(a) < encode_dt(b));
    assert!(encode_dt(b) < encode_dt(c));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn role_codes() {
    assert_eq!(decode_role(encode_role(Role::Admin)).unwrap(), Role::Admin);
    assert_eq!(decode_role(encode_role(Role::User)).unwrap(), Role::User);
    assert!(matches!(decode_role("root"), Err(Error::UnknownRole(_))));
  }
}
