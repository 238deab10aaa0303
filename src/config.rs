use std::env;

/// Fallback signing secret for local runs and tests. Never accepted in production.
pub const LOCAL_JWT_SECRET: &str = "noteful-local-development-secret";

/// Seven days, matching the session length the web client expects.
pub const DEFAULT_JWT_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// AppConfig
///
/// Holds the application's configuration. Immutable once loaded and pulled into
/// handlers through `FromRef`, so every request sees the same values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // Runtime environment marker. Controls log format and which secrets are mandatory.
    pub env: Env,
    // Secret used to sign and verify bearer tokens (HS256).
    pub jwt_secret: String,
    // Lifetime of an issued token, in seconds.
    pub jwt_expiry_secs: u64,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// The runtime context: `Local` for development (pretty logs, optional database),
/// `Production` for deployments (JSON logs, every secret required).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test state scaffolding.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            jwt_expiry_secs: DEFAULT_JWT_EXPIRY_SECS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup.
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL` or `JWT_SECRET` is missing, and in any
    /// environment when `JWT_EXPIRY_SECS` is set but not a number. The server must not
    /// start with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_expiry_secs = match env::var("JWT_EXPIRY_SECS") {
            Ok(raw) => raw
                .parse()
                .expect("FATAL: JWT_EXPIRY_SECS must be a whole number of seconds"),
            Err(_) => DEFAULT_JWT_EXPIRY_SECS,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                // Without a database the server runs against the in-memory store.
                db_url: env::var("DATABASE_URL").ok(),
                jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                jwt_expiry_secs,
                bind_addr,
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in production"),
                ),
                jwt_secret: env::var("JWT_SECRET")
                    .expect("FATAL: JWT_SECRET must be set in production."),
                jwt_expiry_secs,
                bind_addr,
            },
        }
    }
}
