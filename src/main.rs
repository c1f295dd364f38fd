//! Command-line front end for the API transport.
//!
//! ```text
//! api-transport [--config FILE] [--base-url URL] get /users --query page=2 --cache
//! api-transport post /users --data '{"name":"Ada"}'
//! api-transport token set <TOKEN>
//! ```
//!
//! Responses are printed as pretty JSON on stdout; failures go to stderr
//! with a non-zero exit code.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;

use api_transport::config::{load_config, load_from_env, validate_config, ConfigError};
use api_transport::observability::logging::init_logging;
use api_transport::{ApiTransport, RequestOptions, TransportConfig, TransportError};

#[derive(Parser)]
#[command(name = "api-transport")]
#[command(about = "Resilient HTTP API client", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured base URL
    #[arg(short, long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a GET request
    Get(CallArgs),
    /// Send a POST request
    Post(CallArgs),
    /// Send a PUT request
    Put(CallArgs),
    /// Send a PATCH request
    Patch(CallArgs),
    /// Send a DELETE request
    Delete(CallArgs),
    /// Manage the stored bearer token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Args)]
struct CallArgs {
    /// Endpoint path or absolute URL
    endpoint: String,

    /// JSON request body
    #[arg(short, long)]
    data: Option<String>,

    /// Extra header as NAME:VALUE (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Query parameter as KEY=VALUE (repeatable)
    #[arg(short, long)]
    query: Vec<String>,

    /// Per-attempt timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long)]
    no_retry: bool,

    #[arg(long)]
    no_rate_limit: bool,

    /// Serve GET responses from the cache when fresh
    #[arg(long)]
    cache: bool,
}

#[derive(Subcommand)]
enum TokenAction {
    Set { token: String },
    Clear,
    Show,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid argument: {0}")]
    Argument(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if let CliError::Transport(TransportError::Http { body: Some(body), .. }) = &e {
                if let Ok(pretty) = serde_json::to_string_pretty(body) {
                    eprintln!("{pretty}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = resolve_config(cli.config, cli.base_url)?;
    init_logging(&config.observability);

    tracing::debug!(
        base_url = %config.api.base_url,
        max_retries = config.retries.max_retries,
        request_timeout_ms = config.timeouts.request_ms,
        "Configuration loaded"
    );

    let transport = ApiTransport::new(config)?;

    let (method, args) = match cli.command {
        Commands::Get(args) => (Method::GET, args),
        Commands::Post(args) => (Method::POST, args),
        Commands::Put(args) => (Method::PUT, args),
        Commands::Patch(args) => (Method::PATCH, args),
        Commands::Delete(args) => (Method::DELETE, args),
        Commands::Token { action } => {
            return run_token(&transport, action);
        }
    };

    let body = args
        .data
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .map_err(|e| CliError::Argument(format!("--data is not valid JSON: {e}")))?;
    let options = call_options(&args)?;

    let response = transport.request(method, &args.endpoint, body, options).await?;
    match serde_json::to_string_pretty(&response) {
        Ok(out) => println!("{out}"),
        Err(e) => return Err(TransportError::Serialize(e).into()),
    }
    Ok(())
}

fn resolve_config(path: Option<PathBuf>, base_url: Option<String>) -> Result<TransportConfig, CliError> {
    let mut config = match path {
        Some(path) => load_config(&path)?,
        None => load_from_env()?,
    };
    if let Some(base_url) = base_url {
        config.api.base_url = base_url;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

fn run_token(transport: &ApiTransport, action: TokenAction) -> Result<(), CliError> {
    if transport.config().auth.session_file.is_none() {
        tracing::warn!("No auth.session_file configured, token changes will not persist");
    }
    match action {
        TokenAction::Set { token } => {
            transport.set_token(&token)?;
            println!("Token stored");
        }
        TokenAction::Clear => {
            transport.clear_token()?;
            println!("Token cleared");
        }
        TokenAction::Show => match transport.token() {
            Some(token) => println!("{token}"),
            None => println!("No token stored"),
        },
    }
    Ok(())
}

fn call_options(args: &CallArgs) -> Result<RequestOptions, CliError> {
    let mut options = RequestOptions::new();

    for raw in &args.headers {
        let (name, value) = split_pair(raw, ':')?;
        options = options.header(name, value);
    }
    for raw in &args.query {
        let (key, value) = split_pair(raw, '=')?;
        options = options.query(key, value);
    }
    if let Some(ms) = args.timeout_ms {
        options = options.timeout(Duration::from_millis(ms));
    }
    if args.no_retry {
        options = options.retry(false);
    }
    if args.no_rate_limit {
        options = options.rate_limit(false);
    }
    if args.cache {
        options = options.cache(true);
    }
    Ok(options)
}

fn split_pair(raw: &str, sep: char) -> Result<(String, String), CliError> {
    raw.split_once(sep)
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| CliError::Argument(format!("expected KEY{sep}VALUE, got '{raw}'")))
}
