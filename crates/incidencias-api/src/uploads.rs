//! The photo upload directory.
//!
//! Files get server-assigned names (`<uuid>.<ext>`) and are served back
//! under [`URL_PREFIX`]. Nothing about the content is checked; the only
//! limit is the request body size.

use std::{
  io,
  path::{Path, PathBuf},
};

use uuid::Uuid;

/// Path prefix under which stored files are served.
pub const URL_PREFIX: &str = "/uploads/";

/// Longest file extension carried over from the client file name.
const MAX_EXTENSION_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct UploadDir {
  root:      PathBuf,
  max_bytes: usize,
}

impl UploadDir {
  /// Use `root` for uploads, creating it if needed.
  pub async fn create(root: impl Into<PathBuf>, max_bytes: usize) -> io::Result<Self> {
    let root = root.into();
    tokio::fs::create_dir_all(&root).await?;
    Ok(Self { root, max_bytes })
  }

  pub fn root(&self) -> &Path { &self.root }

  /// Largest accepted request body, photo included.
  pub fn max_bytes(&self) -> usize { self.max_bytes }

  /// Write `bytes` under a fresh name and return its retrieval path.
  pub async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> io::Result<String> {
    let id = Uuid::new_v4();
    let file_name = match extension(original_name) {
      Some(ext) => format!("{id}.{ext}"),
      None => id.to_string(),
    };
    tokio::fs::write(self.root.join(&file_name), bytes).await?;
    tracing::debug!(file = %file_name, size = bytes.len(), "photo stored");
    Ok(format!("{URL_PREFIX}{file_name}"))
  }

  /// Remove the file behind a retrieval path. Failures are only logged.
  pub async fn remove(&self, url: &str) {
    let Some(path) = self.path_for(url) else {
      tracing::warn!(url, "not an upload path, nothing removed");
      return;
    };
    match tokio::fs::remove_file(&path).await {
      Ok(()) => tracing::debug!(url, "photo removed"),
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(e) => tracing::warn!(url, error = %e, "could not remove photo"),
    }
  }

  /// Map a retrieval path back to a file inside the upload directory.
  pub fn path_for(&self, url: &str) -> Option<PathBuf> {
    let name = url.strip_prefix(URL_PREFIX)?;
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
      return None;
    }
    Some(self.root.join(name))
  }
}

fn extension(file_name: Option<&str>) -> Option<String> {
  let ext = Path::new(file_name?).extension()?.to_str()?;
  let ok = !ext.is_empty()
    && ext.len() <= MAX_EXTENSION_LEN
    && ext.chars().all(|c| c.is_ascii_alphanumeric());
  ok.then(|| ext.to_ascii_lowercase())
}
