//! Handlers for `/login` and `/register`, and the Basic-auth principal
//! extractor used by every mutating endpoint.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/login` | Body: `{"username","password"}`; 401 on bad credentials |
//! | `POST` | `/register` | Body: `{"username","password","name"}`; 201, or 400 if taken |

use axum::{
  Json,
  extract::{FromRequest, FromRequestParts, State},
  http::{HeaderMap, StatusCode, header, request::Parts},
  response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use incidencias_core::{
  auth::Principal,
  store::IncidentStore,
  user::UserInfo,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

// ─── Request bodies ──────────────────────────────────────────────────────────

/// [`Json`] whose rejections answer with the API's `{"error"}` body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

/// `POST /login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<LoginBody>,
) -> Result<Json<UserInfo>, ApiError>
where
  S: IncidentStore + 'static,
{
  let info = state.auth.login(&body.username, &body.password).await?;
  tracing::info!(username = %info.username, "login");
  Ok(Json(info))
}

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub username: String,
  pub password: String,
  #[serde(default)]
  pub name:     String,
}

/// `POST /register`, returns 201 + the new account.
pub async fn register<S>(
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IncidentStore + 'static,
{
  let info = state
    .auth
    .register(&body.username, &body.password, &body.name)
    .await?;
  tracing::info!(username = %info.username, "account registered");
  Ok((StatusCode::CREATED, Json(info)))
}

// ─── Principal extractor ─────────────────────────────────────────────────────

/// The verified user behind a mutating request.
pub struct Authenticated(pub Principal);

/// Pull `(username, password)` out of an HTTP Basic `Authorization` header.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::AuthRequired)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::AuthRequired)?;

  let decoded = B64.decode(encoded.trim()).map_err(|_| ApiError::AuthRequired)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::AuthRequired)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::AuthRequired)?;
  Ok((username.to_owned(), password.to_owned()))
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: IncidentStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (username, password) = basic_credentials(&parts.headers)?;
    let principal = state
      .auth
      .authenticate(&username, &password)
      .await
      .map_err(|e| match e {
        incidencias_core::Error::Unauthorized => ApiError::AuthRequired,
        other => ApiError::from(other),
      })?;
    Ok(Authenticated(principal))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn decodes_basic_header() {
    let value = format!("Basic {}", B64.encode("ana:pa:ss"));
    let (user, pass) = basic_credentials(&headers(&value)).unwrap();
    assert_eq!(user, "ana");
    assert_eq!(pass, "pa:ss");
  }

  #[test]
  fn rejects_missing_or_malformed_header() {
    assert!(matches!(basic_credentials(&HeaderMap::new()), Err(ApiError::AuthRequired)));
    assert!(matches!(basic_credentials(&headers("Bearer abc")), Err(ApiError::AuthRequired)));
    assert!(matches!(
      basic_credentials(&headers("Basic !!!not-base64!!!")),
      Err(ApiError::AuthRequired)
    ));
    let no_colon = format!("Basic {}", B64.encode("anapass"));
    assert!(matches!(basic_credentials(&headers(&no_colon)), Err(ApiError::AuthRequired)));
  }
}
