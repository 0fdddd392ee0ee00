//! The logged-in session, persisted as JSON between invocations.
//!
//! The password is kept because every mutating call carries HTTP Basic
//! credentials; the file is written with owner-only permissions on Unix.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use incidencias_core::{auth::Principal, user::UserInfo};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub user:     UserInfo,
  pub password: String,
}

impl Session {
  pub fn principal(&self) -> Principal { Principal::from(&self.user) }

  pub fn credentials(&self) -> (String, String) {
    (self.user.username.clone(), self.password.clone())
  }

  /// Read the session at `path`; `None` if nobody is logged in.
  pub fn load(path: &Path) -> Result<Option<Self>> {
    let raw = match std::fs::read_to_string(path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e).with_context(|| format!("reading session {}", path.display())),
    };
    let session = serde_json::from_str(&raw)
      .with_context(|| format!("parsing session {}", path.display()))?;
    Ok(Some(session))
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent()
      && !dir.as_os_str().is_empty()
    {
      std::fs::create_dir_all(dir)
        .with_context(|| format!("creating session directory {}", dir.display()))?;
    }
    let raw = serde_json::to_string_pretty(self).context("serialising session")?;
    std::fs::write(path, raw).with_context(|| format!("writing session {}", path.display()))?;
    restrict_permissions(path)?;
    tracing::debug!(path = %path.display(), "session saved");
    Ok(())
  }

  /// Remove the session file. Returns whether one existed.
  pub fn clear(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(e).with_context(|| format!("removing session {}", path.display())),
    }
  }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
  use std::os::unix::fs::PermissionsExt;
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
    .with_context(|| format!("restricting permissions of {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> { Ok(()) }

/// `~/.config/incidencias/session.json`, or `./.incidencias-session.json`
/// when `HOME` is unset.
pub fn default_path() -> PathBuf {
  match std::env::var("HOME") {
    Ok(home) => PathBuf::from(home).join(".config/incidencias/session.json"),
    Err(_) => PathBuf::from(".incidencias-session.json"),
  }
}
