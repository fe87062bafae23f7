//! tollgate: command-line driver for the query gateway.
//!
//! Builds a gateway from configuration, runs a single query through it and
//! prints the outcome as JSON. Deferred queries are polled until they reach
//! a terminal state.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tollgate::config::{Config, Secrets};
use tollgate::{BackendChoice, Identity, QueryRequest, QueryResponse, TaskStatus};

/// Tollgate: caching, rate-limiting gateway for text-generation backends.
#[derive(Parser)]
#[command(name = "tollgate")]
#[command(version = tollgate::PKG_VERSION)]
#[command(about = "Caching, rate-limiting gateway for text-generation backends")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "TOLLGATE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit one query and print the result
    Query {
        /// Prompt text
        prompt: String,
        /// Bypass the response cache
        #[arg(long)]
        no_cache: bool,
        /// Defer execution and poll for the result
        #[arg(long = "async")]
        deferred: bool,
        /// Number of prompt characters kept
        #[arg(long, default_value_t = tollgate::types::DEFAULT_CONTEXT_SIZE)]
        context_size: usize,
        /// Backend to send the prompt to
        #[arg(long, value_enum, default_value_t = BackendArg::Mock)]
        backend: BackendArg,
        /// Identity for rate limiting (defaults to the loopback address)
        #[arg(long)]
        user: Option<String>,
        /// Poll interval for deferred queries, in milliseconds
        #[arg(long, default_value_t = 250)]
        poll_ms: u64,
    },

    /// Load the configuration and print the effective settings
    CheckConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Mock,
    ChatCompletion,
}

impl From<BackendArg> for BackendChoice {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Mock => BackendChoice::Mock,
            BackendArg::ChatCompletion => BackendChoice::ChatCompletion,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::load_or_default(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    match args.command {
        Command::CheckConfig => {
            let gateway = config.builder(&secrets).build()?;
            println!("tollgate {}", tollgate::version_string());
            println!("{config:#?}");
            println!(
                "chat_completion backend: {}",
                if gateway.has_backend(BackendChoice::ChatCompletion) {
                    "configured"
                } else {
                    "not configured"
                }
            );
        }
        Command::Query {
            prompt,
            no_cache,
            deferred,
            context_size,
            backend,
            user,
            poll_ms,
        } => {
            let gateway = config.builder(&secrets).build()?;
            let _maintenance = gateway.spawn_maintenance();
            info!(version = tollgate::version_string(), "tollgate starting");

            let identity = Identity::resolve(user.as_deref(), IpAddr::V4(Ipv4Addr::LOCALHOST));
            let request = QueryRequest::new(prompt, identity)
                .use_cache(!no_cache)
                .use_async(deferred)
                .context_size(context_size)
                .backend(backend.into());

            let response = gateway.query(request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);

            if let QueryResponse::Deferred { task_id } = response {
                let interval = Duration::from_millis(poll_ms.max(1));
                loop {
                    tokio::time::sleep(interval).await;
                    let task = gateway.poll(&task_id)?;
                    if task.status != TaskStatus::Processing {
                        println!("{}", serde_json::to_string_pretty(&task)?);
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
