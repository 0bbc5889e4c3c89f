use blog_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{self, RepositoryState, SqliteRepository},
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point, responsible for initializing configuration,
/// logging, the database, and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // Loads .env file settings before configuration can be read.
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Prioritizes RUST_LOG, falling back to sensible development defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: pretty output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON output for ingestion by log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (SQLite)
    // The database file is created on first run; tables are bootstrapped
    // below if they do not exist yet.
    let options = SqliteConnectOptions::from_str(&config.db_url)
        .expect("FATAL: Invalid DATABASE_URL.")
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("FATAL: Failed to open the SQLite database. Check DATABASE_URL.");

    repository::init_schema(&pool)
        .await
        .expect("FATAL: Failed to create database tables.");

    // Instantiate the repository, wrapping it in an Arc for shared access.
    let repo = Arc::new(SqliteRepository::new(pool)) as RepositoryState;

    // 5. Unified State Assembly
    let app_state = AppState { repo, config };

    // 6. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:5002")
        .await
        .expect("FATAL: Failed to bind 0.0.0.0:5002");

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:5002");

    axum::serve(listener, app)
        .await
        .expect("FATAL: Server terminated unexpectedly.");
}
