use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup
/// and shared immutably with handlers and extractors through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local `x-user-id` bypass and log format.
    pub env: Env,
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // Secret used to sign and validate JWTs (HS256).
    pub jwt_secret: String,
    // Lifetime of issued tokens.
    pub jwt_ttl_seconds: u64,
    // Address the HTTP listener binds to.
    pub bind_address: String,
    // Work factor for password hashing.
    pub bcrypt_cost: u32,
    // Optional bootstrap administrator, created at startup when missing.
    pub admin_seed: Option<AdminSeed>,
}

/// Env
///
/// Defines the runtime context: `Local` enables developer conveniences,
/// `Production` demands every secret explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// AdminSeed
///
/// Credentials of the first administrator. Without one there is no account able
/// to create other accounts.
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub email: String,
}

const LOCAL_JWT_SECRET: &str = "catalog-local-development-secret";
const DEFAULT_JWT_TTL_SECONDS: u64 = 60 * 60 * 24;
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

impl Default for AppConfig {
    /// Safe, non-panicking values for tests: local env, in-memory store and the
    /// cheapest bcrypt cost.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            jwt_ttl_seconds: DEFAULT_JWT_TTL_SECONDS,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            bcrypt_cost: 4,
            admin_seed: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in `Production` when `DATABASE_URL` or `JWT_SECRET` is missing, and
    /// in any environment when a numeric variable does not parse. The process
    /// must not start half-configured.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => {
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production.")
            }
            Env::Local => env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
        };

        let db_url = match env {
            Env::Production => Some(
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in production."),
            ),
            Env::Local => env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
        };

        let jwt_ttl_seconds = env::var("JWT_TTL_SECONDS")
            .map(|raw| raw.parse().expect("FATAL: JWT_TTL_SECONDS must be an integer."))
            .unwrap_or(DEFAULT_JWT_TTL_SECONDS);

        let bcrypt_cost = env::var("BCRYPT_COST")
            .map(|raw| raw.parse().expect("FATAL: BCRYPT_COST must be an integer."))
            .unwrap_or(bcrypt::DEFAULT_COST);

        let bind_address =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());

        let admin_seed = match (env::var("ADMIN_USERNAME"), env::var("ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) => {
                let email = env::var("ADMIN_EMAIL")
                    .unwrap_or_else(|_| format!("{username}@localhost"));
                Some(AdminSeed {
                    username,
                    password,
                    email,
                })
            }
            _ => None,
        };

        Self {
            env,
            db_url,
            jwt_secret,
            jwt_ttl_seconds,
            bind_address,
            bcrypt_cost,
            admin_seed,
        }
    }
}
