//! Handlers for `/incidents` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/incidents` | Optional `search`, `type`, `status`, `date` filters |
//! | `GET`    | `/incidents/:code` | 404 if not found |
//! | `POST`   | `/incidents` | Multipart form; Basic auth; returns 201 |
//! | `PUT`    | `/incidents/:code` | Multipart form, every field optional; Basic auth |
//! | `DELETE` | `/incidents/:code` | Basic auth; owner or admin only |

use std::collections::HashMap;

use axum::{
  Json,
  body::Bytes,
  extract::{Multipart, Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use incidencias_core::{
  filter::IncidentFilter,
  incident::{Incident, IncidentChanges, IncidentDraft},
  store::IncidentStore,
};
use serde_json::json;

use crate::{AppState, auth::Authenticated, error::ApiError};

// ─── Form parsing ────────────────────────────────────────────────────────────

/// A photo part of the form.
struct ImageUpload {
  file_name: Option<String>,
  bytes:     Bytes,
}

/// Text fields by name plus the optional `image` file.
#[derive(Default)]
struct IncidentForm {
  fields: HashMap<String, String>,
  image:  Option<ImageUpload>,
}

impl IncidentForm {
  async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
    let mut form = IncidentForm::default();
    while let Some(field) = multipart.next_field().await? {
      let Some(name) = field.name().map(str::to_owned) else { continue };
      if name == "image" {
        let file_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await?;
        // Browsers send an empty part when no file was picked.
        if !bytes.is_empty() {
          form.image = Some(ImageUpload { file_name, bytes });
        }
      } else {
        let value = field.text().await?;
        form.fields.insert(name, value);
      }
    }
    Ok(form)
  }

  fn take(&mut self, key: &str) -> Option<String> { self.fields.remove(key) }

  fn into_draft(mut self) -> (IncidentDraft, Option<ImageUpload>) {
    let draft = IncidentDraft {
      code:            self.take("code"),
      name:            self.take("name"),
      kind:            self.take("type"),
      status:          self.take("status"),
      location:        self.take("location"),
      description:     self.take("description"),
      reported_by:     self.take("reportedBy"),
      timestamp:       self.take("timestamp"),
      occurrence_time: self.take("occurrenceTime"),
      lat:             self.take("lat"),
      lng:             self.take("lng"),
    };
    (draft, self.image)
  }

  fn into_changes(mut self) -> (IncidentChanges, Option<ImageUpload>) {
    let changes = IncidentChanges {
      name:            self.take("name"),
      kind:            self.take("type"),
      status:          self.take("status"),
      location:        self.take("location"),
      description:     self.take("description"),
      reported_by:     self.take("reportedBy"),
      occurrence_time: self.take("occurrenceTime"),
      lat:             self.take("lat"),
      lng:             self.take("lng"),
    };
    (changes, self.image)
  }
}

async fn store_image<S>(
  state: &AppState<S>,
  image: Option<ImageUpload>,
) -> Result<Option<String>, ApiError> {
  match image {
    Some(img) => Ok(Some(state.uploads.save(img.file_name.as_deref(), &img.bytes).await?)),
    None => Ok(None),
  }
}

// ─── List / get ──────────────────────────────────────────────────────────────

/// `GET /incidents[?search=...][&type=...][&status=...][&date=YYYY-MM-DD]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(filter): Query<IncidentFilter>,
) -> Result<Json<Vec<Incident>>, ApiError>
where
  S: IncidentStore + 'static,
{
  let incidents = state.incidents.list().await?;
  Ok(Json(filter.apply(incidents)))
}

/// `GET /incidents/:code`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(code): Path<String>,
) -> Result<Json<Incident>, ApiError>
where
  S: IncidentStore + 'static,
{
  Ok(Json(state.incidents.get(&code).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /incidents`, returns 201 + the stored incident.
///
/// The creator is the authenticated principal; a `userId` form field is
/// ignored.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  S: IncidentStore + 'static,
{
  let mut form = IncidentForm::read(multipart).await?;
  if let Some(claimed) = form.take("userId")
    && claimed != principal.id.to_string()
  {
    tracing::debug!(%claimed, user = %principal.username, "ignoring userId form field");
  }

  let (draft, image) = form.into_draft();
  let image_url = store_image(&state, image).await?;

  match state.incidents.create(&principal, draft, image_url.clone()).await {
    Ok(incident) => Ok((StatusCode::CREATED, Json(incident))),
    Err(e) => {
      if let Some(url) = &image_url {
        state.uploads.remove(url).await;
      }
      Err(e.into())
    }
  }
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /incidents/:code`, partial update; the photo is replaced only when
/// a new file is sent, and the replaced file is then removed.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Path(code): Path<String>,
  multipart: Multipart,
) -> Result<Json<Incident>, ApiError>
where
  S: IncidentStore + 'static,
{
  let (changes, image) = IncidentForm::read(multipart).await?.into_changes();
  let previous_image = match &image {
    Some(_) => state.incidents.get(&code).await?.image_url,
    None => None,
  };
  let image_url = store_image(&state, image).await?;

  match state.incidents.update(&principal, &code, changes, image_url.clone()).await {
    Ok(incident) => {
      if let Some(old) = previous_image
        && incident.image_url.as_deref() != Some(old.as_str())
      {
        state.uploads.remove(&old).await;
      }
      Ok(Json(incident))
    }
    Err(e) => {
      if let Some(url) = &image_url {
        state.uploads.remove(url).await;
      }
      Err(e.into())
    }
  }
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /incidents/:code`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IncidentStore + 'static,
{
  let removed = state.incidents.delete(&principal, &code).await?;
  if let Some(url) = &removed.image_url {
    state.uploads.remove(url).await;
  }
  Ok(Json(json!({ "message": format!("incident {code} deleted") })))
}
