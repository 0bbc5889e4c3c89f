use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. The struct is immutable
/// once loaded and shared across all requests via the application state.
#[derive(Clone)]
pub struct AppConfig {
    // Database connection string (SQLite by default).
    pub db_url: String,
    // Secret used to key session-token hashes. Rotating it invalidates
    // every outstanding session cookie.
    pub session_secret: String,
    // Runtime environment marker. Controls log formatting.
    pub env: Env,
}

/// Env
///
/// Defines the runtime context, used to switch between developer-friendly
/// output locally and structured output in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// Default connection string: a database file next to the binary, created on
/// first startup if absent.
pub const DEFAULT_DB_URL: &str = "sqlite://blog.db";

const LOCAL_SESSION_SECRET: &str = "insecure-local-session-secret";

impl Default for AppConfig {
    /// Provides a safe, non-panicking AppConfig primarily used for test setup.
    /// Uses an in-memory database so tests never touch the filesystem.
    fn default() -> Self {
        Self {
            db_url: "sqlite::memory:".to_string(),
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the configuration at startup.
    /// Reads all parameters from environment variables, fail-fast.
    ///
    /// # Panics
    /// Panics if `SESSION_SECRET` is missing in production. Starting without
    /// it would leave sessions keyed by a publicly known value.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // The production secret is mandatory and must be explicitly set.
        // Locally we fall back to a fixed development value.
        let session_secret = match env {
            Env::Production => env::var("SESSION_SECRET")
                .expect("FATAL: SESSION_SECRET must be set in production."),
            _ => env::var("SESSION_SECRET").unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string()),
        };

        // The connection string is optional everywhere; the default is a local
        // database file created automatically on first run.
        let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DB_URL.to_string());

        Self {
            db_url,
            session_secret,
            env,
        }
    }
}
