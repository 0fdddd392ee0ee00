//! [`SqliteStore`], the SQLite implementation of [`IncidentStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use incidencias_core::{
  incident::{Incident, IncidentPatch},
  store::IncidentStore,
  user::User,
};

use crate::{
  Result,
  encode::{
    INCIDENT_SELECT, RawIncident, RawUser, USER_COLUMNS, encode_dt, encode_role, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Incidencias store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// `true` when `e` is a UNIQUE or PRIMARY KEY constraint violation.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

// ─── IncidentStore impl ──────────────────────────────────────────────────────

impl IncidentStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn find_user(&self, username: &str) -> Result<Option<User>> {
    let username = username.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            rusqlite::params![username],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn insert_user(&self, user: User) -> Result<Option<User>> {
    let id_str   = encode_uuid(user.id);
    let username = user.username.clone();
    let password = user.password.clone();
    let name     = user.name.clone();
    let role_str = encode_role(user.role);
    let at_str   = encode_dt(user.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
          rusqlite::params![id_str, username, password, name, role_str, at_str],
        );
        match result {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(inserted.then_some(user))
  }

  // ── Incidents ─────────────────────────────────────────────────────────────

  async fn list_incidents(&self) -> Result<Vec<Incident>> {
    let raws: Vec<RawIncident> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "{INCIDENT_SELECT} ORDER BY i.created_at DESC, i.rowid DESC"
        ))?;
        let rows = stmt
          .query_map([], RawIncident::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIncident::into_incident).collect()
  }

  async fn get_incident(&self, code: &str) -> Result<Option<Incident>> {
    let code = code.to_owned();

    let raw: Option<RawIncident> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("{INCIDENT_SELECT} WHERE i.code = ?1"),
            rusqlite::params![code],
            RawIncident::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIncident::into_incident).transpose()
  }

  async fn insert_incident(&self, incident: Incident) -> Result<Option<Incident>> {
    let code            = incident.code.to_string();
    let name            = incident.name.clone();
    let kind            = incident.kind.clone();
    let status          = incident.status.clone();
    let location        = incident.location.clone();
    let description     = incident.description.clone();
    let reported_by     = incident.reported_by.clone();
    let lat             = incident.lat;
    let lng             = incident.lng;
    let image_url       = incident.image_url.clone();
    let timestamp       = encode_dt(incident.timestamp);
    let occurrence_time = encode_dt(incident.occurrence_time);
    let user_id         = incident.user_id.map(encode_uuid);
    let created_at      = encode_dt(incident.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO incidents (
             code, name, kind, status, location, description, reported_by,
             lat, lng, image_url, timestamp, occurrence_time, user_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
          rusqlite::params![
            code,
            name,
            kind,
            status,
            location,
            description,
            reported_by,
            lat,
            lng,
            image_url,
            timestamp,
            occurrence_time,
            user_id,
            created_at,
          ],
        );
        match result {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      tracing::debug!(code = %incident.code, "insert rejected by unique constraint");
      return Ok(None);
    }
    // Read back through the joined select so `posted_by` is filled in.
    self.get_incident(incident.code.as_str()).await
  }

  async fn update_incident(&self, code: &str, patch: IncidentPatch) -> Result<Option<Incident>> {
    let code            = code.to_owned();
    let occurrence_time = patch.occurrence_time.map(encode_dt);

    let raw: Option<RawIncident> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE incidents SET
             name            = COALESCE(?2, name),
             kind            = COALESCE(?3, kind),
             status          = COALESCE(?4, status),
             location        = COALESCE(?5, location),
             description     = COALESCE(?6, description),
             reported_by     = COALESCE(?7, reported_by),
             occurrence_time = COALESCE(?8, occurrence_time),
             lat             = COALESCE(?9, lat),
             lng             = COALESCE(?10, lng),
             image_url       = COALESCE(?11, image_url)
           WHERE code = ?1",
          rusqlite::params![
            code,
            patch.name,
            patch.kind,
            patch.status,
            patch.location,
            patch.description,
            patch.reported_by,
            occurrence_time,
            patch.lat,
            patch.lng,
            patch.image_url,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        let raw = tx.query_row(
          &format!("{INCIDENT_SELECT} WHERE i.code = ?1"),
          rusqlite::params![code],
          RawIncident::from_row,
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawIncident::into_incident).transpose()
  }

  async fn delete_incident(&self, code: &str) -> Result<bool> {
    let code = code.to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute("DELETE FROM incidents WHERE code = ?1", rusqlite::params![code])?;
        Ok(n > 0)
      })
      .await?;

    Ok(deleted)
  }
}
