use std::env;

/// Fallback signing secret for local runs. Never accepted in production.
const LOCAL_SESSION_SECRET: &str = "local-development-session-secret";

/// Session lifetime used when `SESSION_TTL_SECS` is unset: one day.
const DEFAULT_SESSION_TTL_SECS: i64 = 60 * 60 * 24;

/// Upper bound for `SESSION_TTL_SECS`: one year.
pub const MAX_SESSION_TTL_SECS: i64 = 60 * 60 * 24 * 365;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// immutable afterwards; handlers and the `AuthUser` extractor receive it through
/// `FromRef`, so every part of a request sees the same settings.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` in local mode selects the in-memory store.
    pub db_url: Option<String>,
    // HMAC secret used to sign and verify session tokens.
    pub session_secret: String,
    // Lifetime of an issued session token and its cookie, in seconds.
    pub session_ttl_secs: i64,
    // Login email treated as the administrator when authorizing deletes.
    pub admin_email: String,
    // bcrypt work factor for new password hashes.
    pub bcrypt_cost: u32,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Runtime environment marker. Controls the log format and the store fallback.
    pub env: Env,
    // Lets an `x-user-id` header stand in for a session. Off unless explicitly enabled,
    // and never enabled in production.
    pub user_id_header_bypass: bool,
}

/// Env
///
/// Runtime context: `Local` enables pretty logs and the in-memory store fallback;
/// `Production` requires every secret to be set explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Non-panicking values for test state. The header bypass stays off, so tests that
    /// want it must opt in just like a deployment would.
    fn default() -> Self {
        Self {
            db_url: None,
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            admin_email: "admin".to_string(),
            // Cheapest cost bcrypt accepts, keeps test suites fast.
            bcrypt_cost: 4,
            bind_addr: "127.0.0.1:0".to_string(),
            env: Env::Local,
            user_id_header_bypass: false,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment and fails fast on anything
    /// that would leave the service insecure or half-configured.
    ///
    /// The process involves:
    /// 1. Environment: `APP_ENV=production` selects `Env::Production`; anything else,
    ///    including unset, is `Env::Local`.
    /// 2. Secrets: `SESSION_SECRET` and `DATABASE_URL` are mandatory in production. Locally
    ///    the secret falls back to a fixed development value and a missing database URL
    ///    selects the seeded in-memory store.
    /// 3. Sessions: `SESSION_TTL_SECS` must be a positive integer no larger than
    ///    `MAX_SESSION_TTL_SECS`; unset means one day.
    /// 4. Header bypass: enabled only by `ALLOW_USER_ID_HEADER=true`, and only outside
    ///    production. The environment alone never turns it on.
    /// 5. Everything else (`ADMIN_EMAIL`, `BCRYPT_COST`, `BIND_ADDR`) has a default.
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL` or `SESSION_SECRET` is missing or when
    /// `ALLOW_USER_ID_HEADER` is set, and in any environment when `SESSION_TTL_SECS` is
    /// set but out of range.
    pub fn load() -> Self {
        // 1. Environment
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        // 2. Secrets
        let session_secret = match env {
            Env::Production => env::var("SESSION_SECRET")
                .expect("FATAL: SESSION_SECRET must be set in production."),
            Env::Local => {
                env::var("SESSION_SECRET").unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string())
            }
        };

        let db_url = match env {
            Env::Production => Some(
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in production"),
            ),
            Env::Local => env::var("DATABASE_URL").ok(),
        };

        // 3. Sessions
        let session_ttl_secs = match env::var("SESSION_TTL_SECS") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|ttl| (1..=MAX_SESSION_TTL_SECS).contains(ttl))
                .expect("FATAL: SESSION_TTL_SECS must be a positive integer of at most one year"),
            Err(_) => DEFAULT_SESSION_TTL_SECS,
        };

        // 4. Header bypass
        let user_id_header_bypass = env::var("ALLOW_USER_ID_HEADER")
            .is_ok_and(|raw| raw.eq_ignore_ascii_case("true") || raw == "1");
        if user_id_header_bypass && env == Env::Production {
            panic!("FATAL: ALLOW_USER_ID_HEADER cannot be enabled in production");
        }

        // 5. Defaults
        let bcrypt_cost = env::var("BCRYPT_COST")
            .ok()
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(bcrypt::DEFAULT_COST);

        Self {
            db_url,
            session_secret,
            session_ttl_secs,
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin".to_string()),
            bcrypt_cost,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            env,
            user_id_header_bypass,
        }
    }
}
