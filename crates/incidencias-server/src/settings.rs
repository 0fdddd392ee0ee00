//! Runtime server configuration.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Prefix of the environment variables that override the config file,
/// e.g. `INCIDENCIAS_PORT=8080`.
pub const ENV_PREFIX: &str = "INCIDENCIAS";

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment. Every field has a default, so an empty config is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub database_path:    PathBuf,
  pub upload_dir:       PathBuf,
  /// Frontend directory served for every path outside `/api` and `/uploads`.
  pub static_dir:       Option<PathBuf>,
  pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:             "0.0.0.0".to_string(),
      port:             3000,
      database_path:    PathBuf::from("incidencias.db"),
      upload_dir:       PathBuf::from("uploads"),
      static_dir:       None,
      max_upload_bytes: 10 * 1024 * 1024,
    }
  }
}

impl ServerConfig {
  /// Layer the (optional) TOML file at `path` and `INCIDENCIAS_*` variables
  /// over the defaults.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX))
      .build()
      .context("failed to read config file")?;

    let mut cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;

    cfg.database_path = expand_tilde(&cfg.database_path);
    cfg.upload_dir = expand_tilde(&cfg.upload_dir);
    cfg.static_dir = cfg.static_dir.as_deref().map(expand_tilde);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_gives_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = ServerConfig::load(&tmp.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.port, ServerConfig::default().port);
    assert_eq!(cfg.upload_dir, PathBuf::from("uploads"));
    assert_eq!(cfg.static_dir, None);
  }

  #[test]
  fn file_overrides_some_fields() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(
      &path,
      "port = 8081\ndatabase_path = \"/var/lib/incidencias/db.sqlite\"\nstatic_dir = \"public\"\n",
    )
    .unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    assert_eq!(cfg.port, 8081);
    assert_eq!(cfg.database_path, PathBuf::from("/var/lib/incidencias/db.sqlite"));
    assert_eq!(cfg.static_dir, Some(PathBuf::from("public")));
    assert_eq!(cfg.host, "0.0.0.0");
    assert_eq!(cfg.address(), "0.0.0.0:8081");
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/data/x.db")), PathBuf::from(home).join("data/x.db"));
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }
}
