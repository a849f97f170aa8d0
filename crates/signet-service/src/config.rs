use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{key} is not a valid {expected}: {value}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Brevo transactional-mail credentials. Absent when the deployment has no
/// mail provider configured; outgoing mail is then logged instead of sent.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
}

/// All runtime configuration, read once at startup and passed into the token
/// codec and account service at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,

    /// Secret for the signed-payload scheme (session + activation tokens).
    pub signing_secret: Vec<u8>,
    /// Secret for the derived password-reset scheme. Falls back to
    /// `signing_secret` when not set separately.
    pub reset_secret: Vec<u8>,

    pub session_ttl_secs: i64,
    pub activation_ttl_secs: i64,
    /// Width of the password-reset time bucket. Tokens from the current or
    /// immediately preceding bucket are accepted.
    pub reset_window_secs: i64,

    pub password_iterations: u32,

    pub mail: Option<MailConfig>,
}

pub fn normalize_env_value(raw: String) -> String {
    let trimmed = raw.trim();

    if let Some(inner) = trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return inner.trim().to_string();
    }
    if let Some(inner) = trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return inner.trim().to_string();
    }

    trimmed.to_string()
}

pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(normalize_env_value)
        .filter(|s| !s.is_empty())
}

fn require_env(key: &'static str) -> Result<String, ConfigError> {
    env_string(key).ok_or(ConfigError::Missing(key))
}

fn env_i64(key: &'static str, default: i64) -> Result<i64, ConfigError> {
    match env_string(key) {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
            key,
            expected: "integer number of seconds",
            value: v,
        }),
        None => Ok(default),
    }
}

fn env_u32(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env_string(key) {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
            key,
            expected: "integer",
            value: v,
        }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let signing_secret = require_env("SIGNING_SECRET")?.into_bytes();
        let reset_secret = env_string("RESET_SECRET")
            .map(String::into_bytes)
            .unwrap_or_else(|| signing_secret.clone());

        let mail = match (env_string("BREVO_API_KEY"), env_string("BREVO_SENDER_EMAIL")) {
            (Some(api_key), Some(sender_email)) => Some(MailConfig {
                api_key,
                sender_email,
                sender_name: env_string("BREVO_SENDER_NAME"),
            }),
            _ => None,
        };

        Ok(Self {
            database_url: require_env("DATABASE_URL")?,
            bind_addr: env_string("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8000".to_string()),
            signing_secret,
            reset_secret,
            session_ttl_secs: env_i64("SESSION_TTL_SECS", 30 * 60)?,
            activation_ttl_secs: env_i64("ACTIVATION_TTL_SECS", 12 * 60)?,
            reset_window_secs: env_i64("RESET_WINDOW_SECS", 60 * 60)?,
            password_iterations: env_u32("PASSWORD_ITERATIONS", 100_000)?,
            mail,
        })
    }
}
