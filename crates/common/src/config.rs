//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Bot automation limits.
    #[serde(default)]
    pub bots: BotsConfig,
    /// Coin economy settings.
    #[serde(default)]
    pub economy: EconomyConfig,
    /// Payment intake limits.
    #[serde(default)]
    pub payments: PaymentsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Guardrails for the auto-like loop.
#[derive(Debug, Clone, Deserialize)]
pub struct BotsConfig {
    /// Maximum number of bot profiles examined per invocation.
    #[serde(default = "default_scan_limit")]
    pub scan_limit: u64,
    /// Maximum number of likes sent per invocation.
    #[serde(default = "default_max_likes_per_run")]
    pub max_likes_per_run: usize,
    /// Auto-like calls allowed per user within the window.
    #[serde(default = "default_auto_like_max_calls")]
    pub auto_like_max_calls: u32,
    /// Auto-like rate limit window in seconds.
    #[serde(default = "default_auto_like_window_secs")]
    pub auto_like_window_secs: u64,
}

/// Coin economy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EconomyConfig {
    /// Coins credited to the owner of a referral code.
    #[serde(default = "default_referrer_bonus")]
    pub referrer_bonus: i64,
    /// Coins credited to the user applying a referral code.
    #[serde(default = "default_referee_bonus")]
    pub referee_bonus: i64,
    /// Spend reasons that cost premium users nothing.
    #[serde(default = "default_premium_free_reasons")]
    pub premium_free_reasons: Vec<String>,
    /// How long a spend waits for the user's confirmation.
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
}

/// Payment velocity limits.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsConfig {
    /// Largest amount accepted for a single payment.
    #[serde(default = "default_max_payment_amount")]
    pub max_amount: i64,
    /// Pending payments a user may have open at once.
    #[serde(default = "default_max_pending")]
    pub max_pending_per_user: u64,
    /// Payments a user may create per rolling hour.
    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: u64,
    /// Failed payments tolerated per rolling day.
    #[serde(default = "default_max_failures_per_day")]
    pub max_failures_per_day: u64,
}

impl Default for BotsConfig {
    fn default() -> Self {
        Self {
            scan_limit: default_scan_limit(),
            max_likes_per_run: default_max_likes_per_run(),
            auto_like_max_calls: default_auto_like_max_calls(),
            auto_like_window_secs: default_auto_like_window_secs(),
        }
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            referrer_bonus: default_referrer_bonus(),
            referee_bonus: default_referee_bonus(),
            premium_free_reasons: default_premium_free_reasons(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
        }
    }
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            max_amount: default_max_payment_amount(),
            max_pending_per_user: default_max_pending(),
            max_per_hour: default_max_per_hour(),
            max_failures_per_day: default_max_failures_per_day(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_scan_limit() -> u64 {
    30
}

const fn default_max_likes_per_run() -> usize {
    3
}

const fn default_auto_like_max_calls() -> u32 {
    3
}

const fn default_auto_like_window_secs() -> u64 {
    60
}

const fn default_referrer_bonus() -> i64 {
    50
}

const fn default_referee_bonus() -> i64 {
    25
}

fn default_premium_free_reasons() -> Vec<String> {
    vec!["chat_initiation".to_string()]
}

const fn default_confirm_timeout_secs() -> u64 {
    120
}

const fn default_max_payment_amount() -> i64 {
    5000
}

const fn default_max_pending() -> u64 {
    3
}

const fn default_max_per_hour() -> u64 {
    5
}

const fn default_max_failures_per_day() -> u64 {
    3
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `AMORA_ENV`)
    /// 4. Environment variables with `AMORA_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("AMORA_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("AMORA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("AMORA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_sections_use_defaults() {
        let raw = r#"
            [server]
            port = 8080

            [database]
            url = "postgres://localhost/amora"
        "#;
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.bots.scan_limit, 30);
        assert_eq!(config.bots.max_likes_per_run, 3);
        assert_eq!(config.economy.referrer_bonus, 50);
        assert_eq!(config.economy.referee_bonus, 25);
        assert_eq!(config.economy.premium_free_reasons, vec!["chat_initiation"]);
        assert_eq!(config.payments.max_per_hour, 5);
    }

    #[test]
    fn test_partial_section_override() {
        let raw = r#"
            [server]
            [database]
            url = "postgres://localhost/amora"

            [bots]
            scan_limit = 10
        "#;
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.bots.scan_limit, 10);
        assert_eq!(config.bots.max_likes_per_run, 3);
        assert_eq!(config.bots.auto_like_window_secs, 60);
    }
}
