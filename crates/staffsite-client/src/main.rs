//! `staffsite`: send one operation to a running staffsite backend.
//!
//! # Usage
//!
//! ```text
//! staffsite --url http://localhost:3000 '{ ping }'
//! staffsite --email jana@agency.example --password secret \
//!   'mutation { updateSection }' --variables '{"name":"faq","content":[]}'
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Map, Value};
use staffsite_client::GraphqlClient;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "staffsite", about = "Send a query or mutation to the staffsite backend")]
struct Args {
  /// Base URL of the backend.
  #[arg(long, env = "STAFFSITE_URL", default_value = "http://localhost:3000")]
  url: String,

  /// Log in with this email before sending the operation.
  #[arg(long, env = "STAFFSITE_EMAIL", requires = "password")]
  email: Option<String>,

  #[arg(long, env = "STAFFSITE_PASSWORD", hide_env_values = true)]
  password: Option<String>,

  /// Print the logged-in identity and its permissions instead of sending an
  /// operation.
  #[arg(long, conflicts_with = "operation")]
  me: bool,

  /// Operation text, e.g. `{ ping }`.
  #[arg(required_unless_present = "me")]
  operation: Option<String>,

  /// Variables as a JSON object.
  #[arg(long, value_parser = parse_variables)]
  variables: Option<Map<String, Value>>,
}

fn parse_variables(raw: &str) -> Result<Map<String, Value>, String> {
  match serde_json::from_str(raw) {
    Ok(Value::Object(map)) => Ok(map),
    Ok(_) => Err("variables must be a JSON object".to_string()),
    Err(e) => Err(e.to_string()),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();
  let client = GraphqlClient::new(&args.url).context("failed to build client")?;

  let session = match (&args.email, &args.password) {
    (Some(email), Some(password)) => {
      Some(client.login(email, password).await.context("login failed")?)
    }
    _ => None,
  };

  let output = if args.me {
    serde_json::to_value(client.me().await.context("GET /api/auth/me failed")?)?
  } else {
    let operation = args.operation.as_deref().unwrap_or_default();
    client
      .send::<Value>(operation, args.variables, session.as_ref())
      .await
      .with_context(|| format!("operation against {} failed", client.base_url()))?
  };
  println!("{}", serde_json::to_string_pretty(&output)?);

  if session.is_some() {
    client.logout().await.context("logout failed")?;
  }
  Ok(())
}
