use std::str::FromStr;

/// Default WhatsApp Cloud API base URL (Graph API version included).
const DEFAULT_WHATSAPP_API_URL: &str = "https://graph.facebook.com/v17.0";

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 5)
    pub db_max_connections: u32,

    /// Bearer token for the WhatsApp Cloud API
    pub whatsapp_token: String,

    /// Sender phone number ID registered with the WhatsApp Cloud API
    pub whatsapp_phone_number_id: String,

    /// Graph API base URL, without trailing slash
    pub whatsapp_api_url: String,

    /// Fixed pause between delivery cycles in milliseconds (default: 5000)
    pub notify_delay_ms: u64,

    /// Retries allowed after the first failed attempt (default: 3)
    pub notify_max_retries: u32,

    /// Upper bound for a single delivery attempt in seconds (default: 15)
    pub notify_attempt_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: positive(
                "DB_MAX_CONNECTIONS",
                env_or("DB_MAX_CONNECTIONS", 5)?,
            )?,
            whatsapp_token: required("WHATSAPP_TOKEN")?,
            whatsapp_phone_number_id: required("WHATSAPP_PHONE_NUMBER_ID")?,
            whatsapp_api_url: std::env::var("WHATSAPP_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_WHATSAPP_API_URL.to_string()),
            notify_delay_ms: env_or("NOTIFY_DELAY_MS", 5000)?,
            notify_max_retries: env_or("NOTIFY_MAX_RETRIES", 3)?,
            notify_attempt_timeout_secs: positive(
                "NOTIFY_ATTEMPT_TIMEOUT_SECS",
                env_or("NOTIFY_ATTEMPT_TIMEOUT_SECS", 15)?,
            )?,
        })
    }

    /// Full URL of the Cloud API `messages` endpoint for the configured sender.
    pub fn whatsapp_messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.whatsapp_api_url, self.whatsapp_phone_number_id
        )
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name)
        .map_err(|_| anyhow::anyhow!("{} environment variable is required", name))
}

fn env_or<T: FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    parse_or(name, std::env::var(name).ok(), default)
}

/// Parse an optional raw value, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &str, raw: Option<String>, default: T) -> anyhow::Result<T> {
    match raw {
        Some(value) => value.trim().parse().map_err(|_| {
            anyhow::anyhow!("{} must be a valid {}", name, std::any::type_name::<T>())
        }),
        None => Ok(default),
    }
}

/// Reject zero for settings where it would disable the service outright.
fn positive<T: PartialEq + Default>(name: &str, value: T) -> anyhow::Result<T> {
    if value == T::default() {
        anyhow::bail!("{} must be greater than zero", name);
    }
    Ok(value)
}
