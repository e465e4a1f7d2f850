use chrono_tz::Tz;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} has an invalid value: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Symmetric secret used to sign session tokens.
    pub auth_secret: String,
    pub listen_addr: String,
    /// Comma-separated allowed CORS origins. If empty or "*", allows all origins (dev mode).
    pub cors_origins: String,
    /// Base URL used in links sent by email (password recovery).
    pub public_url: String,
    /// Shared secret expected by the release-reminder sweep endpoint.
    pub cron_token: Option<String>,
    pub omdb_api_key: Option<String>,
    pub omdb_base_url: String,
    pub resend_api_key: Option<String>,
    pub resend_base_url: String,
    pub email_domain: Option<String>,
    /// Timezone that defines "today" for the reminder sweep.
    pub reminder_timezone: Tz,
    /// Prebuilt frontend served for every non-API path, if set.
    pub static_dir: Option<String>,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let reminder_timezone = optional("REMINDER_TIMEZONE")
            .unwrap_or_else(|| "America/Sao_Paulo".to_string());
        let reminder_timezone = reminder_timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid("REMINDER_TIMEZONE", reminder_timezone.clone()))?;

        let cookie_secure = match optional("COOKIE_SECURE").as_deref() {
            None | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => return Err(ConfigError::Invalid("COOKIE_SECURE", other.to_string())),
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            auth_secret: required("AUTH_SECRET")?,
            listen_addr: optional("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            cors_origins: optional("CORS_ORIGINS").unwrap_or_else(|| "*".to_string()),
            public_url: optional("PUBLIC_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            cron_token: optional("CRON_TOKEN"),
            omdb_api_key: optional("OMDB_API_KEY"),
            omdb_base_url: optional("OMDB_BASE_URL")
                .unwrap_or_else(|| "http://www.omdbapi.com/".to_string()),
            resend_api_key: optional("RESEND_API_KEY"),
            resend_base_url: optional("RESEND_BASE_URL")
                .unwrap_or_else(|| "https://api.resend.com".to_string()),
            email_domain: optional("EMAIL_DOMAIN"),
            reminder_timezone,
            static_dir: optional("STATIC_DIR"),
            cookie_secure,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

/// Unset and blank variables are both treated as absent.
fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
