//! Incidents and the inputs that create and change them.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Status values offered by the clients. The field itself is free-form.
pub mod status {
  pub const PENDING: &str = "Pendiente";
  pub const IN_PROGRESS: &str = "En proceso";
  pub const RESOLVED: &str = "Resuelta";

  pub const ALL: [&str; 3] = [PENDING, IN_PROGRESS, RESOLVED];
}

// ─── Code ────────────────────────────────────────────────────────────────────

/// The human-facing key of an incident: six ASCII digits, unique, immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentCode(String);

impl IncidentCode {
  pub const LEN: usize = 6;

  /// Validate a caller-supplied code.
  pub fn parse(raw: &str) -> Result<Self> {
    let raw = raw.trim();
    if raw.len() == Self::LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
      Ok(Self(raw.to_owned()))
    } else {
      Err(Error::BadRequest(format!(
        "incident code must be {} digits, got {raw:?}",
        Self::LEN
      )))
    }
  }

  /// A random code in `100000..=999999`.
  pub fn generate() -> Self {
    let n = 100_000 + OsRng.next_u32() % 900_000;
    Self(n.to_string())
  }

  /// Wrap a code read back from storage without validating it.
  pub fn from_stored(code: String) -> Self { Self(code) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for IncidentCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Incident ────────────────────────────────────────────────────────────────

/// Display data of the user an incident is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reporter {
  pub name:     String,
  pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
  pub code:            IncidentCode,
  pub name:            String,
  #[serde(rename = "type")]
  pub kind:            String,
  pub status:          String,
  pub location:        String,
  pub description:     Option<String>,
  /// Free text typed by the reporter; unrelated to `user_id`.
  pub reported_by:     String,
  pub lat:             Option<f64>,
  pub lng:             Option<f64>,
  /// Retrieval path of the stored photo, e.g. `/uploads/<file>`.
  pub image_url:       Option<String>,
  pub timestamp:       DateTime<Utc>,
  pub occurrence_time: DateTime<Utc>,
  /// The account that created the incident. Never reassigned.
  pub user_id:         Option<Uuid>,
  pub created_at:      DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub posted_by:       Option<Reporter>,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Raw fields of a creation request, as submitted.
#[derive(Debug, Clone, Default)]
pub struct IncidentDraft {
  pub code:            Option<String>,
  pub name:            Option<String>,
  pub kind:            Option<String>,
  pub status:          Option<String>,
  pub location:        Option<String>,
  pub description:     Option<String>,
  pub reported_by:     Option<String>,
  pub timestamp:       Option<String>,
  pub occurrence_time: Option<String>,
  pub lat:             Option<String>,
  pub lng:             Option<String>,
}

impl IncidentDraft {
  /// Validate the draft and build the record to insert.
  ///
  /// Only `name` and `type` are required; everything else falls back to a
  /// default.
  pub fn into_incident(
    self,
    code: IncidentCode,
    user_id: Uuid,
    image_url: Option<String>,
    now: DateTime<Utc>,
  ) -> Result<Incident> {
    let name = supplied(self.name).ok_or_else(|| missing("name"))?;
    let kind = supplied(self.kind).ok_or_else(|| missing("type"))?;

    let timestamp = supplied(self.timestamp)
      .map(|t| parse_timestamp(&t))
      .transpose()?
      .unwrap_or(now);
    let occurrence_time = supplied(self.occurrence_time)
      .map(|t| parse_timestamp(&t))
      .transpose()?
      .unwrap_or(now);

    Ok(Incident {
      code,
      name,
      kind,
      status: supplied(self.status).unwrap_or_else(|| status::PENDING.to_owned()),
      location: self.location.unwrap_or_default(),
      description: supplied(self.description),
      reported_by: self.reported_by.unwrap_or_default(),
      lat: parse_coordinate("lat", self.lat)?,
      lng: parse_coordinate("lng", self.lng)?,
      image_url,
      timestamp,
      occurrence_time,
      user_id: Some(user_id),
      created_at: now,
      posted_by: None,
    })
  }
}

/// Raw fields of an update request. Empty values count as not supplied, so a
/// field can never be cleared through an update.
#[derive(Debug, Clone, Default)]
pub struct IncidentChanges {
  pub name:            Option<String>,
  pub kind:            Option<String>,
  pub status:          Option<String>,
  pub location:        Option<String>,
  pub description:     Option<String>,
  pub reported_by:     Option<String>,
  pub occurrence_time: Option<String>,
  pub lat:             Option<String>,
  pub lng:             Option<String>,
}

impl IncidentChanges {
  pub fn into_patch(self, image_url: Option<String>) -> Result<IncidentPatch> {
    Ok(IncidentPatch {
      name: supplied(self.name),
      kind: supplied(self.kind),
      status: supplied(self.status),
      location: supplied(self.location),
      description: supplied(self.description),
      reported_by: supplied(self.reported_by),
      occurrence_time: supplied(self.occurrence_time)
        .map(|t| parse_timestamp(&t))
        .transpose()?,
      lat: parse_coordinate("lat", self.lat)?,
      lng: parse_coordinate("lng", self.lng)?,
      image_url,
    })
  }
}

/// A validated partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentPatch {
  pub name:            Option<String>,
  pub kind:            Option<String>,
  pub status:          Option<String>,
  pub location:        Option<String>,
  pub description:     Option<String>,
  pub reported_by:     Option<String>,
  pub occurrence_time: Option<DateTime<Utc>>,
  pub lat:             Option<f64>,
  pub lng:             Option<f64>,
  pub image_url:       Option<String>,
}

impl IncidentPatch {
  /// Apply the patch in place. `code`, `timestamp`, `user_id` and
  /// `created_at` are not part of a patch.
  pub fn apply(self, incident: &mut Incident) {
    fn set<T>(slot: &mut T, value: Option<T>) {
      if let Some(v) = value {
        *slot = v;
      }
    }
    set(&mut incident.name, self.name);
    set(&mut incident.kind, self.kind);
    set(&mut incident.status, self.status);
    set(&mut incident.location, self.location);
    set(&mut incident.reported_by, self.reported_by);
    set(&mut incident.occurrence_time, self.occurrence_time);
    if self.description.is_some() {
      incident.description = self.description;
    }
    if self.lat.is_some() {
      incident.lat = self.lat;
    }
    if self.lng.is_some() {
      incident.lng = self.lng;
    }
    if self.image_url.is_some() {
      incident.image_url = self.image_url;
    }
  }
}

// ─── Parsing helpers ─────────────────────────────────────────────────────────

fn supplied(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

fn missing(field: &str) -> Error { Error::BadRequest(format!("missing required field: {field}")) }

fn parse_coordinate(field: &str, value: Option<String>) -> Result<Option<f64>> {
  let Some(raw) = supplied(value) else { return Ok(None) };
  match raw.trim().parse::<f64>() {
    Ok(v) if v.is_finite() => Ok(Some(v)),
    _ => Err(Error::BadRequest(format!("{field} is not a number: {raw:?}"))),
  }
}

/// Parse a client timestamp.
///
/// Accepts RFC 3339, a zone-less `YYYY-MM-DDTHH:MM[:SS[.fff]]` (what a
/// `datetime-local` input submits; read as UTC) and a bare `YYYY-MM-DD`.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Ok(dt.with_timezone(&Utc));
  }
  for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
      return Ok(naive.and_utc());
    }
  }
  if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    && let Some(naive) = date.and_hms_opt(0, 0, 0)
  {
    return Ok(naive.and_utc());
  }
  Err(Error::BadRequest(format!("unrecognised timestamp: {raw:?}")))
}

/// The RFC 3339 rendering used on the wire, `2024-05-01T14:30:00Z`.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
