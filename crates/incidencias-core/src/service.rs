//! The incident service: validated create, partial update, authorized delete.

use std::sync::Arc;

use chrono::Utc;

use crate::{
  Error, Result,
  auth::Principal,
  incident::{Incident, IncidentChanges, IncidentCode, IncidentDraft},
  store::IncidentStore,
};

/// How many random codes to try before giving up on a create without a code.
const CODE_ATTEMPTS: usize = 8;

pub struct IncidentService<S> {
  store: Arc<S>,
}

impl<S> Clone for IncidentService<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: IncidentStore> IncidentService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// All incidents, newest first.
  pub async fn list(&self) -> Result<Vec<Incident>> {
    self.store.list_incidents().await.map_err(Error::store)
  }

  pub async fn get(&self, code: &str) -> Result<Incident> {
    self
      .store
      .get_incident(code)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::IncidentNotFound(code.to_owned()))
  }

  /// Validate `draft` and store it as a new incident owned by `principal`.
  ///
  /// A supplied code must be free; a missing one is generated.
  /// `image_url` is the path of an already stored photo, if any.
  pub async fn create(
    &self,
    principal: &Principal,
    draft: IncidentDraft,
    image_url: Option<String>,
  ) -> Result<Incident> {
    let requested = draft
      .code
      .as_deref()
      .filter(|c| !c.trim().is_empty())
      .map(IncidentCode::parse)
      .transpose()?;
    let fixed = requested.is_some();

    let mut incident = draft.into_incident(
      requested.unwrap_or_else(IncidentCode::generate),
      principal.id,
      image_url,
      Utc::now(),
    )?;

    for _ in 0..CODE_ATTEMPTS {
      let code = incident.code.clone();
      if let Some(stored) = self.store.insert_incident(incident.clone()).await.map_err(Error::store)? {
        tracing::info!(%code, user = %principal.username, "incident created");
        return Ok(stored);
      }
      if fixed {
        return Err(Error::CodeTaken(code.to_string()));
      }
      tracing::debug!(%code, "generated incident code collided, retrying");
      incident.code = IncidentCode::generate();
    }
    Err(Error::CodeExhausted(CODE_ATTEMPTS))
  }

  /// Apply the supplied fields of `changes` to the incident with `code`.
  /// The photo is only replaced when `image_url` is `Some`.
  pub async fn update(
    &self,
    principal: &Principal,
    code: &str,
    changes: IncidentChanges,
    image_url: Option<String>,
  ) -> Result<Incident> {
    let patch = changes.into_patch(image_url)?;
    let updated = self
      .store
      .update_incident(code, patch)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::IncidentNotFound(code.to_owned()))?;
    tracing::info!(code, user = %principal.username, "incident updated");
    Ok(updated)
  }

  /// Delete the incident with `code` if `principal` may, returning the
  /// removed record so the caller can clean up its photo.
  pub async fn delete(&self, principal: &Principal, code: &str) -> Result<Incident> {
    let incident = self.get(code).await?;
    if !principal.may_delete(&incident) {
      tracing::debug!(code, user = %principal.username, "delete refused");
      return Err(Error::Forbidden(code.to_owned()));
    }
    if !self.store.delete_incident(code).await.map_err(Error::store)? {
      return Err(Error::IncidentNotFound(code.to_owned()));
    }
    tracing::info!(code, user = %principal.username, "incident deleted");
    Ok(incident)
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;
  use crate::{incident::status, memory::MemoryStore, user::Role};

  fn principal(role: Role) -> Principal {
    Principal { id: Uuid::new_v4(), username: "tester".into(), role }
  }

  fn draft(code: Option<&str>, name: &str, kind: &str) -> IncidentDraft {
    IncidentDraft {
      code: code.map(str::to_owned),
      name: Some(name.into()),
      kind: Some(kind.into()),
      location: Some("Av. Arequipa 123".into()),
      reported_by: Some("Vecino".into()),
      description: Some("Se robaron una bicicleta".into()),
      ..Default::default()
    }
  }

  fn service() -> (Arc<MemoryStore>, IncidentService<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    (store.clone(), IncidentService::new(store))
  }

  #[tokio::test]
  async fn create_records_owner_and_defaults() {
    let (_, svc) = service();
    let owner = principal(Role::User);
    let incident = svc
      .create(&owner, draft(Some("123456"), "Robo de bicicleta", "Robo"), None)
      .await
      .unwrap();
    assert_eq!(incident.code.as_str(), "123456");
    assert_eq!(incident.user_id, Some(owner.id));
    assert_eq!(incident.status, status::PENDING);
    assert_eq!(incident.occurrence_time, incident.created_at);
  }

  #[tokio::test]
  async fn create_without_code_generates_one() {
    let (_, svc) = service();
    let incident = svc
      .create(&principal(Role::User), draft(None, "Bache", "Vía"), None)
      .await
      .unwrap();
    assert!(IncidentCode::parse(incident.code.as_str()).is_ok());

    let blank = svc
      .create(&principal(Role::User), draft(Some("  "), "Bache", "Vía"), None)
      .await
      .unwrap();
    assert_ne!(blank.code, incident.code);
  }

  #[tokio::test]
  async fn create_rejects_malformed_code() {
    let (store, svc) = service();
    let err = svc
      .create(&principal(Role::User), draft(Some("12-34"), "Bache", "Vía"), None)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
    assert!(store.list_incidents().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn create_requires_name_and_type() {
    let (store, svc) = service();
    let err = svc
      .create(&principal(Role::User), draft(Some("123456"), "", "Robo"), None)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
    let err = svc
      .create(&principal(Role::User), draft(Some("123456"), "Robo", ""), None)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
    assert!(store.list_incidents().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn duplicate_code_never_overwrites() {
    let (_, svc) = service();
    let who = principal(Role::User);
    svc.create(&who, draft(Some("111111"), "Primero", "Robo"), None).await.unwrap();

    let err = svc
      .create(&who, draft(Some("111111"), "Segundo", "Incendio"), None)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::CodeTaken(c) if c == "111111"));

    let kept = svc.get("111111").await.unwrap();
    assert_eq!(kept.name, "Primero");
    assert_eq!(kept.kind, "Robo");
  }

  #[tokio::test]
  async fn update_status_changes_only_status() {
    let (_, svc) = service();
    let who = principal(Role::User);
    let before = svc
      .create(&who, draft(Some("222222"), "Fuga de agua", "Servicios"), Some("/uploads/a.jpg".into()))
      .await
      .unwrap();

    let changes = IncidentChanges { status: Some(status::RESOLVED.into()), ..Default::default() };
    let after = svc.update(&who, "222222", changes, None).await.unwrap();

    assert_eq!(after.status, status::RESOLVED);
    assert_eq!(Incident { status: before.status.clone(), posted_by: None, ..after }, before);
  }

  #[tokio::test]
  async fn update_replaces_photo_only_when_uploaded() {
    let (_, svc) = service();
    let who = principal(Role::User);
    svc.create(&who, draft(Some("333333"), "Grafiti", "Vandalismo"), Some("/uploads/old.png".into()))
      .await
      .unwrap();

    let kept = svc
      .update(&who, "333333", IncidentChanges { name: Some("Grafiti grande".into()), ..Default::default() }, None)
      .await
      .unwrap();
    assert_eq!(kept.image_url.as_deref(), Some("/uploads/old.png"));

    let replaced = svc
      .update(&who, "333333", IncidentChanges::default(), Some("/uploads/new.png".into()))
      .await
      .unwrap();
    assert_eq!(replaced.image_url.as_deref(), Some("/uploads/new.png"));
    assert_eq!(replaced.name, "Grafiti grande");
  }

  #[tokio::test]
  async fn update_cannot_clear_description() {
    let (_, svc) = service();
    let who = principal(Role::User);
    svc.create(&who, draft(Some("444444"), "Ruido", "Molestias"), None).await.unwrap();
    let after = svc
      .update(&who, "444444", IncidentChanges { description: Some(String::new()), ..Default::default() }, None)
      .await
      .unwrap();
    assert_eq!(after.description.as_deref(), Some("Se robaron una bicicleta"));
  }

  #[tokio::test]
  async fn update_unknown_code_is_not_found() {
    let (_, svc) = service();
    let err = svc
      .update(&principal(Role::Admin), "999999", IncidentChanges::default(), None)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::IncidentNotFound(_)));
  }

  #[tokio::test]
  async fn delete_unknown_code_leaves_store_unchanged() {
    let (store, svc) = service();
    let who = principal(Role::Admin);
    svc.create(&who, draft(Some("555555"), "Choque", "Tránsito"), None).await.unwrap();

    let err = svc.delete(&who, "000000").await.unwrap_err();
    assert!(matches!(err, Error::IncidentNotFound(_)));
    assert_eq!(store.list_incidents().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn delete_is_owner_or_admin_only() {
    let (store, svc) = service();
    let owner = principal(Role::User);
    let stranger = principal(Role::User);
    let admin = principal(Role::Admin);

    svc.create(&owner, draft(Some("666666"), "Choque", "Tránsito"), None).await.unwrap();
    svc.create(&owner, draft(Some("777777"), "Choque", "Tránsito"), None).await.unwrap();

    let err = svc.delete(&stranger, "666666").await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
    assert_eq!(store.list_incidents().await.unwrap().len(), 2);

    let removed = svc.delete(&owner, "666666").await.unwrap();
    assert_eq!(removed.code.as_str(), "666666");
    svc.delete(&admin, "777777").await.unwrap();
    assert!(store.list_incidents().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn list_is_newest_first() {
    let (_, svc) = service();
    let who = principal(Role::User);
    for code in ["100001", "100002", "100003"] {
      svc.create(&who, draft(Some(code), "Robo", "Robo"), None).await.unwrap();
    }
    let codes: Vec<_> = svc
      .list()
      .await
      .unwrap()
      .into_iter()
      .map(|i| i.code.to_string())
      .collect();
    assert_eq!(codes, ["100003", "100002", "100001"]);
  }
}
