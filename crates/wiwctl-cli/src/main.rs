//! wiwctl - a command line client for When I Work shifts.
//!
//! Lists open shifts, your own shifts and pending requests, and lets you
//! take or release shifts. The session token is cached between runs so the
//! password is only needed when the token has expired.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wiwctl_core::auth::{EnvSecretSource, LoginSecret, SecretSource};
use wiwctl_core::{Config, SessionManager, ShiftAction, ShiftId, TokenStore};

// ============================================================================
// Constants
// ============================================================================

/// Results file written by the query commands
const DEFAULT_OUTPUT_FILE: &str = "shifts.json";

#[derive(Debug, Parser)]
#[command(name = "wiwctl", version, about = "Claim and release When I Work shifts")]
struct Cli {
    /// File the query results are written to
    #[arg(short, long, global = true, default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,

    /// Ask for email and password instead of reading WIW_EMAIL / WIW_PASSWORD
    #[arg(long, global = true)]
    prompt: bool,

    /// Log request flow to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List open shifts and pending requests (the default)
    Open,
    /// List your own shifts for the next year
    Mine,
    /// List your pending requests
    Requests,
    /// Release one or more of your shifts
    Release {
        #[arg(required = true)]
        ids: Vec<ShiftId>,
    },
    /// Take an open shift
    Take { id: ShiftId },
    /// Forget the cached session token
    Logout,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(verbose: bool) {
    // RUST_LOG wins when set; otherwise -v selects debug output
    let default = if verbose { "wiwctl_core=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load().context("Failed to load config")?;
    let data_dir = config.data_dir()?;
    let store = TokenStore::new(&data_dir);
    debug!(?data_dir, "Data directory configured");

    let command = cli.command.unwrap_or(Command::Open);
    if let Command::Logout = command {
        store.clear().context("Failed to remove session token")?;
        println!("Logged out.");
        return Ok(());
    }

    let session = if cli.prompt {
        let secret = prompt_secret(config.email.as_deref())?;
        let session = connect(&config, store, &secret).await?;
        if config.email.as_deref() != Some(secret.email()) {
            config.email = Some(secret.email().to_string());
            config.save().context("Failed to save config")?;
        }
        session
    } else {
        let env = EnvSecretSource::default();
        if env.login_secret().is_none() {
            anyhow::bail!("No credentials: set {} or pass --prompt", env.describe());
        }
        connect(&config, store, &env).await?
    };
    info!(state = ?session.state(), "Session ready");

    match command {
        Command::Open => {
            let open = session.list_open_shifts().await?;
            let requests = session.list_requests().await?;
            println!(
                "{} open shifts, {} pending requests",
                open.shifts.len(),
                request_count(&requests)
            );
            write_results(
                &cli.output,
                [
                    ("open_shifts", serde_json::to_value(&open)?),
                    ("requests", requests),
                ],
            )?;
        }
        Command::Mine => {
            let mine = session.list_assigned_shifts().await?;
            println!("{} shifts assigned to you", mine.shifts.len());
            write_results(&cli.output, [("my_shifts", serde_json::to_value(&mine)?)])?;
        }
        Command::Requests => {
            let requests = session.list_requests().await?;
            println!("{} pending requests", request_count(&requests));
            write_results(&cli.output, [("requests", requests)])?;
        }
        Command::Release { ids } => {
            let outcome = match ids.as_slice() {
                [id] => session.release_shift(Some(*id), None).await?,
                _ => session.release_shift(None, Some(ids.clone())).await?,
            };
            report("release", &ids, &outcome)?;
        }
        Command::Take { id } => {
            let outcome = session.take_shift(Some(id)).await?;
            report("take", &[id], &outcome)?;
        }
        Command::Logout => unreachable!("handled before authentication"),
    }

    Ok(())
}

async fn connect(
    config: &Config,
    store: TokenStore,
    secrets: &dyn SecretSource,
) -> Result<SessionManager> {
    SessionManager::connect(config.session_config(), store, secrets)
        .await
        .context("Failed to start a When I Work session")
}

/// Ask for email (offering the last used one) and password on the terminal
fn prompt_secret(last_email: Option<&str>) -> Result<LoginSecret> {
    match last_email {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let email = match (input.trim(), last_email) {
        ("", Some(last)) => last.to_string(),
        ("", None) => anyhow::bail!("Email is required"),
        (typed, _) => typed.to_string(),
    };

    let password = rpassword::prompt_password("Password: ")?;
    Ok(LoginSecret::new(email, password))
}

/// Write query results as one JSON object keyed by result name
fn write_results<const N: usize>(path: &Path, results: [(&str, Value); N]) -> Result<()> {
    let object: Map<String, Value> = results
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    let contents = serde_json::to_string_pretty(&object)?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write results to {}", path.display()))?;
    println!("Results written to {}", path.display());
    Ok(())
}

/// Number of entries in a requests listing; zero when the body has none
fn request_count(requests: &Value) -> usize {
    requests
        .get("requests")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

fn report(action: &str, ids: &[ShiftId], outcome: &ShiftAction) -> Result<()> {
    let ids = ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
    match outcome {
        ShiftAction::Applied { .. } => {
            println!("Done: {} shift {}", action, ids);
            Ok(())
        }
        ShiftAction::NotApplied { response } => {
            eprintln!("{}", serde_json::to_string_pretty(response)?);
            anyhow::bail!("Not confirmed by the service: {} shift {}", action, ids)
        }
    }
}
