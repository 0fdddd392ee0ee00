//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::{multipart::MultipartError, rejection::JsonRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("invalid credentials")]
  Unauthorized,

  /// Like [`ApiError::Unauthorized`], but answers with a Basic challenge.
  #[error("authentication required")]
  AuthRequired,

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  PayloadTooLarge(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<incidencias_core::Error> for ApiError {
  fn from(e: incidencias_core::Error) -> Self {
    use incidencias_core::Error as E;
    match e {
      E::Unauthorized => ApiError::Unauthorized,
      // Registration reports a taken username as a plain 400.
      E::UsernameTaken(u) => ApiError::BadRequest(format!("username already exists: {u}")),
      E::CodeTaken(c) => ApiError::Conflict(format!("incident code already in use: {c}")),
      E::IncidentNotFound(c) => ApiError::NotFound(format!("incident {c} not found")),
      E::Forbidden(c) => ApiError::Forbidden(format!("not allowed to delete incident {c}")),
      E::BadRequest(m) => ApiError::BadRequest(m),
      other => ApiError::Internal(Box::new(other)),
    }
  }
}

impl From<MultipartError> for ApiError {
  fn from(e: MultipartError) -> Self {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
      ApiError::PayloadTooLarge(e.body_text())
    } else {
      ApiError::BadRequest(format!("malformed form data: {}", e.body_text()))
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(e: JsonRejection) -> Self {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
      ApiError::PayloadTooLarge(e.body_text())
    } else {
      ApiError::BadRequest(e.body_text())
    }
  }
}

impl From<std::io::Error> for ApiError {
  fn from(e: std::io::Error) -> Self { ApiError::Internal(Box::new(e)) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid credentials".to_owned()),
      ApiError::AuthRequired => (StatusCode::UNAUTHORIZED, "authentication required".to_owned()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m.clone()),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
      }
    };
    if status.is_client_error() {
      tracing::debug!(%status, %message, "request rejected");
    }

    let challenge = matches!(self, ApiError::AuthRequired);
    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if challenge {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"incidencias\""),
      );
    }
    res
  }
}
