//! Boot-time configuration: the untrusted [`RawConfig`] and the validated,
//! immutable [`AppConfig`].
//!
//! Validation runs exactly once at process start. Every violated field is
//! collected and logged before the aggregated [`ConfigError`] is returned, so
//! an operator sees all problems in one pass.

use std::{
  net::{IpAddr, SocketAddr},
  path::{Path, PathBuf},
};

use serde::Deserialize;
use strum::{Display, EnumString};
use url::Url;

use crate::error::{ConfigError, Violation};

/// Minimum length, in characters, of the authentication secret.
pub const MIN_SECRET_LEN: usize = 32;

/// Prefix for environment variables, e.g. `STAFFSITE_DATABASE_URL`.
pub const ENV_PREFIX: &str = "STAFFSITE";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

// ─── Raw input ───────────────────────────────────────────────────────────────

/// Configuration exactly as read from the file/environment, before any checks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
  pub database_url: Option<String>,
  pub auth_secret:  Option<String>,
  pub public_url:   Option<String>,
  /// Comma-separated origins.
  pub cors_origins: Option<String>,
  pub upload_dir:   Option<String>,
  pub mode:         Option<String>,
  pub host:         Option<String>,
  pub port:         Option<String>,
}

impl RawConfig {
  /// Read an optional TOML file at `path`, overlaid by `STAFFSITE_*` variables.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.as_ref()).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX))
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  /// Build from explicit key/value pairs (keys without the prefix).
  pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
    let mut raw = RawConfig::default();
    for (key, value) in pairs {
      let slot = match key {
        "database_url" => &mut raw.database_url,
        "auth_secret" => &mut raw.auth_secret,
        "public_url" => &mut raw.public_url,
        "cors_origins" => &mut raw.cors_origins,
        "upload_dir" => &mut raw.upload_dir,
        "mode" => &mut raw.mode,
        "host" => &mut raw.host,
        "port" => &mut raw.port,
        _ => continue,
      };
      *slot = Some(value.to_string());
    }
    raw
  }
}

// ─── Validated record ────────────────────────────────────────────────────────

/// Runtime mode of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
  #[default]
  Development,
  Production,
  Test,
}

/// The validated configuration record. Construct only through [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
  database_url: String,
  auth_secret:  String,
  public_url:   Url,
  cors_origins: Vec<Url>,
  upload_dir:   Option<PathBuf>,
  mode:         Mode,
  host:         IpAddr,
  port:         u16,
}

impl AppConfig {
  pub fn database_url(&self) -> &str { &self.database_url }

  pub fn auth_secret(&self) -> &str { &self.auth_secret }

  pub fn public_url(&self) -> &Url { &self.public_url }

  pub fn cors_origins(&self) -> &[Url] { &self.cors_origins }

  pub fn upload_dir(&self) -> Option<&Path> { self.upload_dir.as_deref() }

  pub fn mode(&self) -> Mode { self.mode }

  pub fn is_production(&self) -> bool { self.mode == Mode::Production }

  pub fn bind_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }

  /// `public_url` joined with `path`, without doubled slashes.
  pub fn absolute_url(&self, path: &str) -> String {
    format!(
      "{}/{}",
      self.public_url.as_str().trim_end_matches('/'),
      path.trim_start_matches('/')
    )
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Validate `raw` into an [`AppConfig`], or report every violated field.
pub fn validate(raw: RawConfig) -> Result<AppConfig, ConfigError> {
  let mut violations = Vec::new();

  let database_url = match non_empty(raw.database_url) {
    Some(url) => Some(url),
    None => {
      violations.push(violation("database_url", "is required and must not be empty"));
      None
    }
  };

  let auth_secret = match non_empty(raw.auth_secret) {
    None => {
      violations.push(violation("auth_secret", "is required"));
      None
    }
    Some(secret) if secret.chars().count() < MIN_SECRET_LEN => {
      violations.push(violation(
        "auth_secret",
        format!("must be at least {MIN_SECRET_LEN} characters long"),
      ));
      None
    }
    Some(secret) => Some(secret),
  };

  let public_url = match non_empty(raw.public_url) {
    None => {
      violations.push(violation("public_url", "is required"));
      None
    }
    Some(s) => match parse_absolute_url(&s) {
      Ok(url) => Some(url),
      Err(reason) => {
        violations.push(violation("public_url", reason));
        None
      }
    },
  };

  let mut cors_origins = Vec::new();
  let mut bad_origins = Vec::new();
  if let Some(list) = raw.cors_origins {
    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
      match parse_absolute_url(entry) {
        Ok(url) => cors_origins.push(url),
        Err(_) => bad_origins.push(format!("{entry:?}")),
      }
    }
  }
  if !bad_origins.is_empty() {
    violations.push(violation(
      "cors_origins",
      format!("entries {} must be absolute http(s) URLs", bad_origins.join(", ")),
    ));
  }

  let upload_dir = non_empty(raw.upload_dir).map(PathBuf::from);

  let mode = match non_empty(raw.mode) {
    None => Some(Mode::default()),
    Some(s) => match s.trim().parse::<Mode>() {
      Ok(mode) => Some(mode),
      Err(_) => {
        violations.push(violation(
          "mode",
          "must be one of development, production, test",
        ));
        None
      }
    },
  };

  let host = match non_empty(raw.host) {
    None => DEFAULT_HOST.parse().ok(),
    Some(s) => match s.trim().parse::<IpAddr>() {
      Ok(ip) => Some(ip),
      Err(_) => {
        violations.push(violation("host", "must be an IP address"));
        None
      }
    },
  };

  let port = match non_empty(raw.port) {
    None => Some(DEFAULT_PORT),
    Some(s) => match s.trim().parse::<u16>() {
      Ok(port) => Some(port),
      Err(_) => {
        violations.push(violation("port", "must be an integer between 0 and 65535"));
        None
      }
    },
  };

  match (database_url, auth_secret, public_url, mode, host, port) {
    (Some(database_url), Some(auth_secret), Some(public_url), Some(mode), Some(host), Some(port))
      if violations.is_empty() =>
    {
      Ok(AppConfig {
        database_url,
        auth_secret,
        public_url,
        cors_origins,
        upload_dir,
        mode,
        host,
        port,
      })
    }
    _ => {
      for v in &violations {
        tracing::error!(field = v.field, "invalid configuration: {} {}", v.field, v.constraint);
      }
      Err(ConfigError::Invalid(violations))
    }
  }
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|s| !s.trim().is_empty())
}

fn violation(field: &'static str, constraint: impl Into<String>) -> Violation {
  Violation { field, constraint: constraint.into() }
}

fn parse_absolute_url(s: &str) -> Result<Url, &'static str> {
  let url = Url::parse(s.trim()).map_err(|_| "must be a well-formed absolute URL")?;
  match url.scheme() {
    "http" | "https" if url.has_host() => Ok(url),
    _ => Err("must be an absolute http(s) URL with a host"),
  }
}

#[cfg(test)]
mod tests {
  use std::{
    fmt,
    sync::{Arc, Mutex},
  };

  use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    subscriber::DefaultGuard,
  };
  use tracing_subscriber::layer::{Context, Layer, SubscriberExt as _};

  use super::*;

  const SECRET: &str = "0123456789abcdef0123456789abcdef";

  /// `(field, message)` of every ERROR event.
  type Logged = Arc<Mutex<Vec<(String, String)>>>;

  struct CaptureErrors(Logged);

  #[derive(Default)]
  struct EventFields {
    field:   String,
    message: String,
  }

  impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
      if field.name() == "field" {
        self.field = value.to_string();
      }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
      if field.name() == "message" {
        self.message = format!("{value:?}");
      }
    }
  }

  impl<S: Subscriber> Layer<S> for CaptureErrors {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
      if *event.metadata().level() == Level::ERROR {
        let mut fields = EventFields::default();
        event.record(&mut fields);
        self.0.lock().unwrap().push((fields.field, fields.message));
      }
    }
  }

  fn capture_errors() -> (Logged, DefaultGuard) {
    let logged = Logged::default();
    let subscriber = tracing_subscriber::registry().with(CaptureErrors(Arc::clone(&logged)));
    (logged, tracing::subscriber::set_default(subscriber))
  }

  fn complete() -> RawConfig {
    RawConfig::from_pairs([
      ("database_url", "sqlite://site.db"),
      ("auth_secret", SECRET),
      ("public_url", "https://agency.example"),
      ("cors_origins", "https://admin.agency.example, https://preview.agency.example"),
      ("upload_dir", "/srv/uploads"),
      ("mode", "production"),
    ])
  }

  #[test]
  fn complete_environment_round_trips_fields() {
    let cfg = validate(complete()).unwrap();
    assert_eq!(cfg.database_url(), "sqlite://site.db");
    assert_eq!(cfg.auth_secret(), SECRET);
    assert_eq!(cfg.public_url().as_str(), "https://agency.example/");
    assert_eq!(cfg.cors_origins().len(), 2);
    assert_eq!(cfg.cors_origins()[1].as_str(), "https://preview.agency.example/");
    assert_eq!(cfg.upload_dir(), Some(Path::new("/srv/uploads")));
    assert_eq!(cfg.mode(), Mode::Production);
    assert_eq!(cfg.bind_addr().to_string(), "127.0.0.1:3000");
  }

  #[test]
  fn mode_defaults_to_development() {
    let mut raw = complete();
    raw.mode = None;
    assert_eq!(validate(raw).unwrap().mode(), Mode::Development);
  }

  #[test]
  fn missing_secret_is_named() {
    let mut raw = complete();
    raw.auth_secret = None;
    let err = validate(raw).unwrap_err();
    assert!(err.names_field("auth_secret"), "{err}");
    assert_eq!(err.violations().len(), 1);
  }

  #[test]
  fn short_secret_fails() {
    let mut raw = complete();
    raw.auth_secret = Some("0123456789".to_string());
    let err = validate(raw).unwrap_err();
    assert!(err.names_field("auth_secret"));
    assert!(err.to_string().contains("at least 32"), "{err}");
  }

  #[test]
  fn blank_secret_is_missing() {
    let mut raw = complete();
    raw.auth_secret = Some(" ".repeat(MIN_SECRET_LEN + 8));
    let err = validate(raw).unwrap_err();
    assert_eq!(err.violations().len(), 1);
    assert_eq!(err.violations()[0].field, "auth_secret");
    assert_eq!(err.violations()[0].constraint, "is required");
  }

  #[test]
  fn malformed_public_url_fails() {
    let mut raw = complete();
    raw.public_url = Some("not a url".to_string());
    assert!(validate(raw).unwrap_err().names_field("public_url"));

    let mut raw = complete();
    raw.public_url = Some("/relative/path".to_string());
    assert!(validate(raw).unwrap_err().names_field("public_url"));
  }

  #[test]
  fn all_violations_are_collected() {
    let (logged, _guard) = capture_errors();
    let raw = RawConfig::from_pairs([
      ("auth_secret", "short"),
      ("public_url", "nope"),
      ("mode", "staging"),
      ("port", "eighty"),
    ]);
    let err = validate(raw).unwrap_err();
    let fields = ["database_url", "auth_secret", "public_url", "mode", "port"];
    for field in fields {
      assert!(err.names_field(field), "missing {field}: {err}");
    }

    let logged = logged.lock().unwrap();
    assert_eq!(logged.len(), fields.len(), "{logged:?}");
    for ((field, message), expected) in logged.iter().zip(fields) {
      assert_eq!(field, expected);
      assert!(message.contains(expected), "{message}");
    }
  }

  #[test]
  fn valid_config_logs_nothing() {
    let (logged, _guard) = capture_errors();
    validate(complete()).unwrap();
    assert!(logged.lock().unwrap().is_empty());
  }

  #[test]
  fn bad_cors_entries_are_one_violation() {
    let (logged, _guard) = capture_errors();
    let mut raw = complete();
    raw.cors_origins = Some("https://ok.example,ftp//broken, mailto:x@y".to_string());
    let err = validate(raw).unwrap_err();
    assert_eq!(err.violations().len(), 1);
    assert!(err.names_field("cors_origins"));
    assert!(err.to_string().contains("ftp//broken"), "{err}");
    assert!(err.to_string().contains("mailto:x@y"), "{err}");
    assert_eq!(logged.lock().unwrap().len(), 1);
  }

  #[test]
  fn absolute_url_joins_cleanly() {
    let cfg = validate(complete()).unwrap();
    assert_eq!(cfg.absolute_url("/sitemap.xml"), "https://agency.example/sitemap.xml");
  }
}
