//! urp-api - Urban Rat Project reporting API
//!
//! `serve` hosts the route table over HTTP; `invoke` runs a single API Gateway
//! proxy event through the dispatcher and prints the response envelope.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use urp_api::{build_router, AppState, Dispatcher, GatewayEvent, QueryExecutor, RouteTable};
use urp_common::config::{load_config, TomlConfig};
use urp_common::db::connector_from_settings;

/// Command-line arguments for urp-api
#[derive(Parser, Debug)]
#[command(name = "urp-api")]
#[command(about = "Urban Rat Project reporting API")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/urp/config.toml, then /etc/urp/config.toml)
    #[arg(short, long, env = "URP_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Database URL (postgres://... or sqlite:...)
    #[arg(long, env = "URP_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// PostgreSQL host when no URL is given
    #[arg(long, env = "PGHOST", global = true)]
    db_host: Option<String>,

    /// Connection timeout in milliseconds
    #[arg(long, env = "URP_CONNECT_TIMEOUT_MS", global = true)]
    connect_timeout_ms: Option<u64>,

    /// Route table file replacing the built-in routes
    #[arg(long, env = "URP_ROUTES_FILE", global = true)]
    routes_file: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "URP_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the route table over HTTP (default)
    Serve {
        /// Listen address
        #[arg(short, long, env = "URP_BIND")]
        bind: Option<String>,
    },
    /// Dispatch one API Gateway proxy event and print the envelope
    Invoke {
        /// Event JSON file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        event: String,
    },
}

impl Args {
    /// Command line and environment take priority over the config file
    fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(url) = &self.database_url {
            config.database.url = Some(url.clone());
        }
        if let Some(host) = &self.db_host {
            config.database.host = Some(host.clone());
        }
        if let Some(timeout) = self.connect_timeout_ms {
            config.database.connect_timeout_ms = timeout;
        }
        if let Some(routes_file) = &self.routes_file {
            config.routes_file = Some(routes_file.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(Command::Serve { bind: Some(bind) }) = &self.command {
            config.server.bind = bind.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_overrides(&mut config);

    // Logs go to stderr so `invoke` output stays clean JSON on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("urp_api={0},urp_common={0},tower_http=info", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting Urban Rat Project API (urp-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let routes = match &config.routes_file {
        Some(path) => RouteTable::load(path)
            .with_context(|| format!("Failed to load routes from {}", path.display()))?,
        None => RouteTable::builtin(),
    };
    info!("Loaded {} routes", routes.len());

    let connector =
        connector_from_settings(&config.database).context("Invalid database configuration")?;
    info!("Database target: {}", connector.target());

    let executor = QueryExecutor::new(connector, config.database.connect_timeout());
    let dispatcher = Dispatcher::new(Arc::new(routes), executor);

    match args.command {
        Some(Command::Invoke { event }) => invoke(&dispatcher, &event).await,
        Some(Command::Serve { .. }) | None => serve(dispatcher, &config.server.bind).await,
    }
}

async fn invoke(dispatcher: &Dispatcher, source: &str) -> Result<()> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read event {}", source))?
    };

    let event: GatewayEvent = serde_json::from_str(&raw).context("Invalid gateway event")?;
    let envelope = dispatcher.dispatch(&event.into()).await?;

    println!("{}", serde_json::to_string(&envelope)?);
    Ok(())
}

async fn serve(dispatcher: Dispatcher, bind: &str) -> Result<()> {
    let app = build_router(AppState::new(dispatcher));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("urp-api listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
