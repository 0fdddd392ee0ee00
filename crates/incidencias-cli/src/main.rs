//! `incidencias`: terminal client for the Incidencias REST API.
//!
//! # Usage
//!
//! ```
//! incidencias --url http://localhost:3000 login ana
//! incidencias list --type Robo --status Pendiente
//! incidencias report --name "Poste caído" --type Infraestructura --location "Av. Larco 500"
//! incidencias --config ~/.config/incidencias/config.toml dashboard
//! ```

mod client;
mod render;
mod session;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{SecondsFormat, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use incidencias_core::{
  dashboard::Dashboard,
  filter::IncidentFilter,
  incident::{IncidentCode, status},
};
use serde::Deserialize;
use session::Session;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "incidencias", about = "Terminal client for the Incidencias API")]
struct Args {
  /// Path to a TOML config file (url, session).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the server (default: http://localhost:3000).
  #[arg(long, env = "INCIDENCIAS_URL")]
  url: Option<String>,

  /// Where the login session is kept.
  #[arg(long, env = "INCIDENCIAS_SESSION", value_name = "FILE")]
  session: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Log in and remember the session.
  Login {
    username: String,
    #[arg(long, env = "INCIDENCIAS_PASSWORD")]
    password: String,
  },
  /// Create an account and log in with it.
  Register {
    username: String,
    #[arg(long, env = "INCIDENCIAS_PASSWORD")]
    password: String,
    /// Display name.
    #[arg(long, default_value = "")]
    name:     String,
  },
  /// Forget the stored session.
  Logout,
  /// List incidents, newest first.
  List(ListArgs),
  /// Show one incident.
  Show { code: String },
  /// Report a new incident.
  Report(ReportArgs),
  /// Change some fields of an incident.
  Update {
    code:   String,
    #[command(flatten)]
    fields: UpdateArgs,
  },
  /// Delete an incident you reported (admins may delete any).
  Delete { code: String },
  /// Counts by type and by status.
  Dashboard,
}

#[derive(ClapArgs, Debug, Default)]
struct ListArgs {
  /// Case-insensitive text matched against name, code and location.
  #[arg(long)]
  search: Option<String>,
  #[arg(long = "type")]
  kind:   Option<String>,
  #[arg(long)]
  status: Option<String>,
  /// Date prefix, e.g. 2024-05 or 2024-05-01.
  #[arg(long)]
  date:   Option<String>,
}

impl From<ListArgs> for IncidentFilter {
  fn from(a: ListArgs) -> Self {
    IncidentFilter { search: a.search, kind: a.kind, status: a.status, date: a.date }
  }
}

#[derive(ClapArgs, Debug)]
struct ReportArgs {
  /// Six-digit code; a random one is used when omitted.
  #[arg(long)]
  code:            Option<String>,
  #[arg(long)]
  name:            String,
  #[arg(long = "type")]
  kind:            String,
  #[arg(long, default_value = status::PENDING)]
  status:          String,
  #[arg(long, default_value = "")]
  location:        String,
  #[arg(long)]
  description:     Option<String>,
  /// Free-text reporter name (defaults to your display name).
  #[arg(long)]
  reported_by:     Option<String>,
  /// When it happened (RFC 3339 or YYYY-MM-DDTHH:MM); now if omitted.
  #[arg(long)]
  occurrence_time: Option<String>,
  #[arg(long, allow_hyphen_values = true)]
  lat:             Option<f64>,
  #[arg(long, allow_hyphen_values = true)]
  lng:             Option<f64>,
  /// Photo to attach.
  #[arg(long, value_name = "FILE")]
  image:           Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct UpdateArgs {
  #[arg(long)]
  name:            Option<String>,
  #[arg(long = "type")]
  kind:            Option<String>,
  #[arg(long)]
  status:          Option<String>,
  #[arg(long)]
  location:        Option<String>,
  #[arg(long)]
  description:     Option<String>,
  #[arg(long)]
  reported_by:     Option<String>,
  #[arg(long)]
  occurrence_time: Option<String>,
  #[arg(long, allow_hyphen_values = true)]
  lat:             Option<f64>,
  #[arg(long, allow_hyphen_values = true)]
  lng:             Option<f64>,
  /// Replacement photo.
  #[arg(long, value_name = "FILE")]
  image:           Option<PathBuf>,
}

// ─── Form fields ──────────────────────────────────────────────────────────────

type Fields = Vec<(&'static str, String)>;

fn push(fields: &mut Fields, name: &'static str, value: Option<String>) {
  if let Some(v) = value {
    fields.push((name, v));
  }
}

impl ReportArgs {
  fn into_fields(self, code: IncidentCode, default_reporter: &str) -> (Fields, Option<PathBuf>) {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut fields: Fields = vec![
      ("code", code.to_string()),
      ("name", self.name),
      ("type", self.kind),
      ("status", self.status),
      ("location", self.location),
      ("reportedBy", self.reported_by.unwrap_or_else(|| default_reporter.to_string())),
      ("timestamp", now.clone()),
      ("occurrenceTime", self.occurrence_time.unwrap_or(now)),
    ];
    push(&mut fields, "description", self.description);
    push(&mut fields, "lat", self.lat.map(|v| v.to_string()));
    push(&mut fields, "lng", self.lng.map(|v| v.to_string()));
    (fields, self.image)
  }
}

impl UpdateArgs {
  fn into_fields(self) -> (Fields, Option<PathBuf>) {
    let mut fields = Fields::new();
    push(&mut fields, "name", self.name);
    push(&mut fields, "type", self.kind);
    push(&mut fields, "status", self.status);
    push(&mut fields, "location", self.location);
    push(&mut fields, "description", self.description);
    push(&mut fields, "reportedBy", self.reported_by);
    push(&mut fields, "occurrenceTime", self.occurrence_time);
    push(&mut fields, "lat", self.lat.map(|v| v.to_string()));
    push(&mut fields, "lng", self.lng.map(|v| v.to_string()));
    (fields, self.image)
  }
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug, PartialEq)]
struct ConfigFile {
  #[serde(default)]
  url:     String,
  #[serde(default)]
  session: Option<PathBuf>,
}

/// Everything a command needs, resolved once from flags, env and file.
struct App {
  client:       ApiClient,
  session_path: PathBuf,
  session:      Option<Session>,
}

impl App {
  fn require_session(&self) -> Result<&Session> {
    match &self.session {
      Some(s) => Ok(s),
      None => bail!("not logged in; run `incidencias login <username>` first"),
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| "http://localhost:3000".to_string());
  let session_path = args
    .session
    .or(file_cfg.session)
    .unwrap_or_else(session::default_path);

  let session = Session::load(&session_path)?;
  let client = ApiClient::new(ApiConfig {
    base_url,
    credentials: session.as_ref().map(Session::credentials),
  })?;

  let app = App { client, session_path, session };
  run(app, args.command).await
}

async fn run(app: App, command: Command) -> Result<()> {
  match command {
    Command::Login { username, password } => {
      let user = app.client.login(&username, &password).await?;
      println!("logged in as {} ({})", user.name, user.username);
      Session { user, password }.save(&app.session_path)?;
    }

    Command::Register { username, password, name } => {
      let user = app.client.register(&username, &password, &name).await?;
      println!("account {} created", user.username);
      Session { user, password }.save(&app.session_path)?;
    }

    Command::Logout => {
      if Session::clear(&app.session_path)? {
        println!("logged out");
      } else {
        println!("no session to clear");
      }
    }

    Command::List(list_args) => {
      let filter = IncidentFilter::from(list_args);
      let incidents = filter.apply(app.client.list_incidents().await?);
      print!("{}", render::incident_table(&incidents));
    }

    Command::Show { code } => {
      let incident = app.client.get_incident(&code).await?;
      print!("{}", render::incident_detail(&incident, app.client.base_url()));
    }

    Command::Report(report) => {
      let session = app.require_session()?;
      let code = match &report.code {
        Some(raw) => IncidentCode::parse(raw)?,
        None => IncidentCode::generate(),
      };
      let (fields, image) = report.into_fields(code, &session.user.name);
      let created = app.client.create_incident(fields, image.as_deref()).await?;
      println!("incident {} reported", created.code);
    }

    Command::Update { code, fields } => {
      app.require_session()?;
      let (fields, image) = fields.into_fields();
      if fields.is_empty() && image.is_none() {
        bail!("nothing to update; pass at least one field");
      }
      let updated = app.client.update_incident(&code, fields, image.as_deref()).await?;
      print!("{}", render::incident_detail(&updated, app.client.base_url()));
    }

    Command::Delete { code } => {
      let session = app.require_session()?;
      let incident = app.client.get_incident(&code).await?;
      if !session.principal().may_delete(&incident) {
        bail!("incident {code} was reported by another user; only its owner or an admin may delete it");
      }
      let message = app.client.delete_incident(&code).await?;
      println!("{message}");
    }

    Command::Dashboard => {
      let dashboard: Dashboard = app.client.dashboard().await?;
      print!("{}", render::dashboard(&dashboard));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn config_file_fields_are_optional() {
    let cfg: ConfigFile = toml::from_str("").unwrap();
    assert_eq!(cfg, ConfigFile::default());

    let cfg: ConfigFile =
      toml::from_str("url = \"http://incidencias.local\"\nsession = \"/tmp/s.json\"\n").unwrap();
    assert_eq!(cfg.url, "http://incidencias.local");
    assert_eq!(cfg.session, Some(PathBuf::from("/tmp/s.json")));
  }

  #[test]
  fn list_flags_become_filter() {
    let args = Args::parse_from(["incidencias", "list", "--type", "Robo", "--date", "2024-05"]);
    let Command::List(list) = args.command else { panic!("expected list") };
    let filter = IncidentFilter::from(list);
    assert_eq!(filter.kind.as_deref(), Some("Robo"));
    assert_eq!(filter.date.as_deref(), Some("2024-05"));
    assert_eq!(filter.search, None);
  }

  #[test]
  fn report_fields_fill_defaults() {
    let args = Args::parse_from([
      "incidencias", "report", "--name", "Poste caído", "--type", "Infraestructura",
      "--lat", "-12.5", "--lng", "-77.25",
    ]);
    let Command::Report(report) = args.command else { panic!("expected report") };
    let code = IncidentCode::parse("123456").unwrap();
    let (fields, image) = report.into_fields(code, "Ana Torres");
    let get = |k: &str| fields.iter().find(|(n, _)| *n == k).map(|(_, v)| v.as_str());

    assert_eq!(get("code"), Some("123456"));
    assert_eq!(get("status"), Some(status::PENDING));
    assert_eq!(get("reportedBy"), Some("Ana Torres"));
    assert_eq!(get("lat"), Some("-12.5"));
    assert_eq!(get("description"), None);
    assert_eq!(get("timestamp"), get("occurrenceTime"));
    assert!(image.is_none());
  }

  #[test]
  fn update_sends_only_given_fields() {
    let args = Args::parse_from(["incidencias", "update", "222222", "--status", "Resuelta"]);
    let Command::Update { code, fields } = args.command else { panic!("expected update") };
    assert_eq!(code, "222222");
    let (fields, image) = fields.into_fields();
    assert_eq!(fields, vec![("status", "Resuelta".to_string())]);
    assert!(image.is_none());
  }
}
