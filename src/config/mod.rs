use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub daily_reset: DailyResetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Used in email subjects and sign-offs.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// IANA zone name. An unrecognized value falls back to UTC.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            app_name: default_app_name(),
            timezone: default_timezone(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_app_name() -> String {
    "Daysweep".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret for access tokens. Overridable via SECRET_KEY.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    #[serde(default = "default_token_expiry_minutes")]
    pub token_expiry_minutes: i64,
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            token_expiry_minutes: default_token_expiry_minutes(),
            admin_username: default_admin_username(),
            admin_email: default_admin_email(),
            admin_password: default_admin_password(),
        }
    }
}

fn default_secret_key() -> String {
    // Generate a random secret if not provided; tokens then only survive
    // until the next restart.
    uuid::Uuid::new_v4().to_string()
}

fn default_token_expiry_minutes() -> i64 {
    20
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_email() -> String {
    "admin@localhost".to_string()
}

fn default_admin_password() -> String {
    "changeme".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Whether the daily cycle sends summary emails at all.
    #[serde(default)]
    pub summary_enabled: bool,
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Overridable via SMTP_USERNAME.
    pub smtp_username: Option<String>,
    /// Overridable via SMTP_PASSWORD.
    pub smtp_password: Option<String>,
    #[serde(default = "default_smtp_use_tls")]
    pub smtp_use_tls: bool,
    /// Explicit From address. Takes precedence over smtp_username.
    pub from_address: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            summary_enabled: false,
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            smtp_use_tls: default_smtp_use_tls(),
            from_address: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_use_tls() -> bool {
    true
}

impl MailConfig {
    /// Resolve the sender address: `from_address` wins, `smtp_username` is
    /// the fallback.
    pub fn sender_address(&self) -> Option<&str> {
        self.from_address
            .as_deref()
            .or(self.smtp_username.as_deref())
    }

    /// A transport exists only when a host and a resolvable sender are
    /// present (the port always has a default).
    pub fn is_configured(&self) -> bool {
        self.smtp_host.is_some() && self.sender_address().is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyResetConfig {
    /// Master switch for the whole summarize-then-purge cycle.
    #[serde(default = "default_daily_reset_enabled")]
    pub enabled: bool,
}

impl Default for DailyResetConfig {
    fn default() -> Self {
        Self {
            enabled: default_daily_reset_enabled(),
        }
    }
}

fn default_daily_reset_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse configuration file")?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            mail: MailConfig::default(),
            daily_reset: DailyResetConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Deployment secrets may come from the environment instead of the file.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SECRET_KEY") {
            if !v.is_empty() {
                self.auth.secret_key = v;
            }
        }
        if let Ok(v) = std::env::var("SMTP_USERNAME") {
            if !v.is_empty() {
                self.mail.smtp_username = Some(v);
            }
        }
        if let Ok(v) = std::env::var("SMTP_PASSWORD") {
            if !v.is_empty() {
                self.mail.smtp_password = Some(v);
            }
        }
    }

    /// The zone the scheduler and summary dates operate in.
    pub fn timezone(&self) -> Tz {
        resolve_timezone(&self.server.timezone)
    }
}

/// Parse an IANA zone name, falling back to UTC with a warning. Never fails
/// past startup.
pub fn resolve_timezone(name: &str) -> Tz {
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!(timezone = %name, "Invalid timezone, falling back to UTC");
            Tz::UTC
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.app_name, "Daysweep");
        assert_eq!(config.server.timezone, "UTC");
        assert!(config.daily_reset.enabled);
        assert!(!config.mail.summary_enabled);
        assert_eq!(config.mail.smtp_port, 587);
    }

    #[test]
    fn test_sender_address_precedence() {
        let mail = MailConfig {
            from_address: Some("noreply@example.com".to_string()),
            smtp_username: Some("bot@example.com".to_string()),
            ..MailConfig::default()
        };
        assert_eq!(mail.sender_address(), Some("noreply@example.com"));

        let mail = MailConfig {
            smtp_username: Some("bot@example.com".to_string()),
            ..MailConfig::default()
        };
        assert_eq!(mail.sender_address(), Some("bot@example.com"));

        let mail = MailConfig::default();
        assert_eq!(mail.sender_address(), None);
    }

    #[test]
    fn test_is_configured_requires_host_and_sender() {
        let mut mail = MailConfig::default();
        assert!(!mail.is_configured());

        mail.smtp_host = Some("smtp.example.com".to_string());
        assert!(!mail.is_configured());

        mail.smtp_username = Some("bot@example.com".to_string());
        assert!(mail.is_configured());

        mail.smtp_host = None;
        assert!(!mail.is_configured());
    }

    #[test]
    fn test_resolve_timezone_valid() {
        assert_eq!(resolve_timezone("Europe/Berlin"), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_resolve_timezone_invalid_falls_back_to_utc() {
        assert_eq!(resolve_timezone("Not/AZone"), Tz::UTC);
        assert_eq!(resolve_timezone(""), Tz::UTC);
    }
}
