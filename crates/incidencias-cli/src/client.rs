//! Async HTTP client wrapping the Incidencias REST API.

use std::{path::Path, time::Duration};

use anyhow::{Context, Result, anyhow};
use incidencias_core::{dashboard::Dashboard, incident::Incident, user::UserInfo};
use reqwest::{
  Client, RequestBuilder, Response,
  multipart::{Form, Part},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;

/// Connection settings for the API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url:    String,
  /// Basic-auth credentials for mutating calls.
  pub credentials: Option<(String, String)>,
}

/// Body of every error response.
#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

/// Async HTTP client for the JSON/multipart API.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  pub fn base_url(&self) -> &str { self.config.base_url.trim_end_matches('/') }

  fn url(&self, path: &str) -> String { format!("{}/api{}", self.base_url(), path) }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    match &self.config.credentials {
      Some((user, pass)) => req.basic_auth(user, Some(pass)),
      None => req,
    }
  }

  // ── Accounts ──────────────────────────────────────────────────────────────

  /// `POST /api/login`
  pub async fn login(&self, username: &str, password: &str) -> Result<UserInfo> {
    let resp = self
      .client
      .post(self.url("/login"))
      .json(&json!({ "username": username, "password": password }))
      .send()
      .await
      .context("POST /login failed")?;
    decode(resp, "POST /login").await
  }

  /// `POST /api/register`
  pub async fn register(&self, username: &str, password: &str, name: &str) -> Result<UserInfo> {
    let resp = self
      .client
      .post(self.url("/register"))
      .json(&json!({ "username": username, "password": password, "name": name }))
      .send()
      .await
      .context("POST /register failed")?;
    decode(resp, "POST /register").await
  }

  // ── Incidents ─────────────────────────────────────────────────────────────

  /// `GET /api/incidents`
  pub async fn list_incidents(&self) -> Result<Vec<Incident>> {
    let resp = self
      .client
      .get(self.url("/incidents"))
      .send()
      .await
      .context("GET /incidents failed")?;
    decode(resp, "GET /incidents").await
  }

  /// `GET /api/incidents/<code>`
  pub async fn get_incident(&self, code: &str) -> Result<Incident> {
    let resp = self
      .client
      .get(self.url(&format!("/incidents/{code}")))
      .send()
      .await
      .with_context(|| format!("GET /incidents/{code} failed"))?;
    decode(resp, "GET /incidents/:code").await
  }

  /// `POST /api/incidents` (multipart)
  pub async fn create_incident(&self, fields: Vec<(&'static str, String)>, image: Option<&Path>) -> Result<Incident> {
    let form = build_form(fields, image).await?;
    let resp = self
      .auth(self.client.post(self.url("/incidents")))
      .multipart(form)
      .send()
      .await
      .context("POST /incidents failed")?;
    decode(resp, "POST /incidents").await
  }

  /// `PUT /api/incidents/<code>` (multipart, only the given fields)
  pub async fn update_incident(
    &self,
    code: &str,
    fields: Vec<(&'static str, String)>,
    image: Option<&Path>,
  ) -> Result<Incident> {
    let form = build_form(fields, image).await?;
    let resp = self
      .auth(self.client.put(self.url(&format!("/incidents/{code}"))))
      .multipart(form)
      .send()
      .await
      .with_context(|| format!("PUT /incidents/{code} failed"))?;
    decode(resp, "PUT /incidents/:code").await
  }

  /// `DELETE /api/incidents/<code>`, returns the server's message.
  pub async fn delete_incident(&self, code: &str) -> Result<String> {
    #[derive(Deserialize)]
    struct Deleted {
      message: String,
    }
    let resp = self
      .auth(self.client.delete(self.url(&format!("/incidents/{code}"))))
      .send()
      .await
      .with_context(|| format!("DELETE /incidents/{code} failed"))?;
    let deleted: Deleted = decode(resp, "DELETE /incidents/:code").await?;
    Ok(deleted.message)
  }

  // ── Dashboard ─────────────────────────────────────────────────────────────

  /// `GET /api/dashboard`
  pub async fn dashboard(&self) -> Result<Dashboard> {
    let resp = self
      .client
      .get(self.url("/dashboard"))
      .send()
      .await
      .context("GET /dashboard failed")?;
    decode(resp, "GET /dashboard").await
  }
}

/// Deserialise a success body, or turn the `{"error"}` body into an error.
async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
  let status = resp.status();
  if status.is_success() {
    return resp.json().await.with_context(|| format!("deserialising {what} response"));
  }
  let message = match resp.json::<ErrorBody>().await {
    Ok(body) => body.error,
    Err(_) => status.canonical_reason().unwrap_or("no reason").to_string(),
  };
  Err(anyhow!("{what} → {status}: {message}"))
}

async fn build_form(fields: Vec<(&'static str, String)>, image: Option<&Path>) -> Result<Form> {
  let mut form = Form::new();
  for (name, value) in fields {
    form = form.text(name, value);
  }
  if let Some(path) = image {
    let bytes = tokio::fs::read(path)
      .await
      .with_context(|| format!("reading image {}", path.display()))?;
    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "image".to_string());
    form = form.part("image", Part::bytes(bytes).file_name(file_name));
  }
  Ok(form)
}
