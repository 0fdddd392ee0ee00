//! JSON/multipart REST API for Incidencias.
//!
//! [`api_router`] exposes the endpoints below `/api`; [`router`] assembles the
//! whole HTTP surface (API, uploaded photos, optional static frontend).
//!
//! Reads are public. Creating, updating and deleting incidents require HTTP
//! Basic credentials of a registered account.

pub mod auth;
pub mod dashboard;
pub mod error;
pub mod incidents;
pub mod uploads;

use std::{path::Path, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use incidencias_core::{auth::AuthService, service::IncidentService, store::IncidentStore};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use error::ApiError;
pub use uploads::UploadDir;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub auth:      AuthService<S>,
  pub incidents: IncidentService<S>,
  pub uploads:   Arc<UploadDir>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      auth:      self.auth.clone(),
      incidents: self.incidents.clone(),
      uploads:   Arc::clone(&self.uploads),
    }
  }
}

impl<S: IncidentStore> AppState<S> {
  pub fn new(store: Arc<S>, uploads: UploadDir) -> Self {
    Self {
      auth:      AuthService::new(Arc::clone(&store)),
      incidents: IncidentService::new(store),
      uploads:   Arc::new(uploads),
    }
  }
}

// ─── Routers ─────────────────────────────────────────────────────────────────

/// The `/api` endpoints, materialised so they can be nested anywhere.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: IncidentStore + 'static,
{
  let body_limit = state.uploads.max_bytes();
  Router::new()
    // Accounts
    .route("/login", post(auth::login::<S>))
    .route("/register", post(auth::register::<S>))
    // Incidents
    .route("/incidents", get(incidents::list::<S>).post(incidents::create::<S>))
    .route(
      "/incidents/{code}",
      get(incidents::get_one::<S>)
        .put(incidents::update::<S>)
        .delete(incidents::delete_one::<S>),
    )
    // Aggregates
    .route("/dashboard", get(dashboard::handler::<S>))
    .layer(DefaultBodyLimit::max(body_limit))
    .with_state(state)
}

/// The full HTTP surface: `/api`, `/uploads` and, if given, a static
/// frontend served for every other path.
pub fn router<S>(state: AppState<S>, static_dir: Option<&Path>) -> Router
where
  S: IncidentStore + 'static,
{
  let uploads = ServeDir::new(state.uploads.root());
  let mut app = Router::new()
    .nest("/api", api_router(state))
    .nest_service(uploads::URL_PREFIX.trim_end_matches('/'), uploads);

  if let Some(dir) = static_dir {
    app = app.fallback_service(ServeDir::new(dir));
  }

  app
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ───────────────────────────────────────────────────────
