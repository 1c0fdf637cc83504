use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use backend_lib::{
    auth::hash_password_secure,
    config::{LogFormat, Settings, DEFAULT_CONFIG_FILE},
    create_router,
    storage::{self, UserRecord, UserRepository},
    AppState,
};
use clap::{Args, Parser, Subcommand};
use recipebox_common::Recipe;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Recipe server with a pluggable authentication gate
#[derive(Debug, Parser)]
#[command(name = "recipebox", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, env = "RECIPEBOX_CONFIG", value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Hash a password and store the user for the `users` verifier
    AddUser(AddUserArgs),
    /// Load a JSON array of recipes into the durable store
    Import(ImportArgs),
}

#[derive(Debug, Args)]
struct AddUserArgs {
    username: String,
    #[arg(long, env = "RECIPEBOX_NEW_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Debug, Args)]
struct ImportArgs {
    /// JSON file holding an array of recipes
    file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    init_tracing(&settings)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::AddUser(args) => add_user(settings, args).await,
        Command::Import(args) => import(settings, args).await,
    }
}

fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .context("invalid log filter")?;

    let fmt_layer = match settings.log_format {
        LogFormat::Json => fmt::layer().json().with_current_span(true).with_target(true).boxed(),
        LogFormat::Pretty => fmt::layer().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to install tracing subscriber")
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let addr = settings.bind_addr;
    let state = AppState::from_settings(settings).await?;
    let app = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

async fn add_user(settings: Settings, args: AddUserArgs) -> anyhow::Result<()> {
    if args.password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    let stores = storage::open(&settings.storage)?;
    let password_hash = hash_password_secure(args.password).await?;

    stores
        .users
        .put_user(UserRecord {
            username: args.username.clone(),
            password_hash,
        })
        .await?;
    tracing::info!(username = %args.username, "user stored");
    Ok(())
}

async fn import(settings: Settings, args: ImportArgs) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    let recipes: Vec<Recipe> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.file.display()))?;

    // through the service so a shared cache is invalidated
    let state = AppState::from_settings(settings).await?;
    let count = recipes.len();
    for recipe in recipes {
        state.recipes.create(recipe).await?;
    }
    tracing::info!(count, file = %args.file.display(), "recipes imported");
    Ok(())
}
