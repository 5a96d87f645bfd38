use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime configuration, read from the environment (and `.env` when present).
///
/// Credentials never have defaults here: a missing username or password means
/// the client asks for them, a missing Telegram token means no forwarding.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub api_prefix: String,
    pub ws_url: Option<String>,
    pub db_path: String,
    pub reconnect_delay: Duration,
    pub dashboard_refresh: Duration,
    pub signals_refresh: Duration,
    pub signal_limit: u32,
    pub username: Option<String>,
    pub password: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<i64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            api_prefix: "/api".to_string(),
            ws_url: None,
            db_path: "dashboard.db".to_string(),
            reconnect_delay: Duration::from_secs(5),
            dashboard_refresh: Duration::from_secs(30),
            signals_refresh: Duration::from_secs(60),
            signal_limit: 20,
            username: None,
            password: None,
            telegram_token: None,
            telegram_chat_id: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            api_url: optional("DASHBOARD_API_URL").unwrap_or(defaults.api_url),
            api_prefix: optional("DASHBOARD_API_PREFIX").unwrap_or(defaults.api_prefix),
            ws_url: optional("DASHBOARD_WS_URL"),
            db_path: optional("DASHBOARD_DB_PATH").unwrap_or(defaults.db_path),
            reconnect_delay: parsed::<u64>("DASHBOARD_RECONNECT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.reconnect_delay),
            dashboard_refresh: period("DASHBOARD_REFRESH_SECS")?.unwrap_or(defaults.dashboard_refresh),
            signals_refresh: period("SIGNALS_REFRESH_SECS")?.unwrap_or(defaults.signals_refresh),
            signal_limit: parsed("DASHBOARD_SIGNAL_LIMIT")?.unwrap_or(defaults.signal_limit),
            username: optional("DASHBOARD_USERNAME"),
            password: optional("DASHBOARD_PASSWORD"),
            telegram_token: optional("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: parsed("TELEGRAM_CHAT_ID")?,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match optional(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(None),
    }
}

/// A refresh period in whole seconds. Zero is rejected.
fn period(key: &'static str) -> Result<Option<Duration>, ConfigError> {
    match parsed::<u64>(key)? {
        Some(0) => Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
        }),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_no_credentials() {
        let cfg = AppConfig::default();
        assert!(cfg.username.is_none());
        assert!(cfg.password.is_none());
        assert!(cfg.telegram_token.is_none());
        assert_eq!(cfg.reconnect_delay, Duration::from_secs(5));
        assert_eq!(cfg.dashboard_refresh, Duration::from_secs(30));
        assert_eq!(cfg.signals_refresh, Duration::from_secs(60));
    }

    #[test]
    fn unparsable_number_is_reported_with_its_key() {
        // Key unique to this test so parallel tests don't interfere.
        unsafe { env::set_var("DASHBOARD_TEST_ONLY_NUMBER", "thirty") };
        let err = parsed::<u64>("DASHBOARD_TEST_ONLY_NUMBER").unwrap_err();
        assert_eq!(
            err.to_string(),
            "DASHBOARD_TEST_ONLY_NUMBER has an invalid value: thirty"
        );
        unsafe { env::remove_var("DASHBOARD_TEST_ONLY_NUMBER") };
    }

    #[test]
    fn zero_refresh_period_is_rejected() {
        unsafe { env::set_var("DASHBOARD_TEST_ONLY_PERIOD", "0") };
        let err = period("DASHBOARD_TEST_ONLY_PERIOD").unwrap_err();
        assert_eq!(err.to_string(), "DASHBOARD_TEST_ONLY_PERIOD has an invalid value: 0");

        unsafe { env::set_var("DASHBOARD_TEST_ONLY_PERIOD", " 45 ") };
        assert_eq!(
            period("DASHBOARD_TEST_ONLY_PERIOD").unwrap(),
            Some(Duration::from_secs(45))
        );
        unsafe { env::remove_var("DASHBOARD_TEST_ONLY_PERIOD") };
    }

    #[test]
    fn zero_signals_refresh_fails_the_whole_config() {
        unsafe { env::set_var("SIGNALS_REFRESH_SECS", "0") };
        let result = AppConfig::from_env();
        unsafe { env::remove_var("SIGNALS_REFRESH_SECS") };
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "SIGNALS_REFRESH_SECS", .. })
        ));
    }
}
