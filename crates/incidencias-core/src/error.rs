//! Error types for `incidencias-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid username or password")]
  Unauthorized,

  #[error("username already taken: {0}")]
  UsernameTaken(String),

  #[error("incident code already in use: {0}")]
  CodeTaken(String),

  #[error("no free incident code after {0} attempts")]
  CodeExhausted(usize),

  #[error("incident not found: {0}")]
  IncidentNotFound(String),

  #[error("not allowed to delete incident {0}")]
  Forbidden(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("password hashing error: {0}")]
  Hash(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Store(Box::new(e))
  }

  /// `true` for errors caused by the server side rather than the request.
  pub fn is_internal(&self) -> bool {
    matches!(self, Error::CodeExhausted(_) | Error::Hash(_) | Error::Store(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
