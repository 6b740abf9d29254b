use config::{Config, ConfigError, Environment, File};
use ethers::types::Address;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// UniswapV2 factory on Ethereum mainnet.
pub const DEFAULT_FACTORY_ADDRESS: &str = "0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f";

/// Environment variable holding the node endpoint.
pub const BLOCKCHAIN_URL_ENV: &str = "BLOCKCHAIN_URL";

/// Prefix of `PAIR_MONITOR__<SECTION>__<KEY>` overrides.
pub const ENV_PREFIX: &str = "PAIR_MONITOR";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Rpc {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Factory {
    #[serde(default = "default_factory_address")]
    pub address: String,
}

fn default_factory_address() -> String {
    DEFAULT_FACTORY_ADDRESS.to_string()
}

impl Default for Factory {
    fn default() -> Self {
        Self {
            address: default_factory_address(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Enumeration {
    /// Maximum number of `allPairs` calls in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Log progress every N completed lookups (0 disables intermediate progress lines)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_max_concurrency() -> usize {
    250
}
fn default_progress_interval() -> u64 {
    1000
}

impl Default for Enumeration {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            progress_interval: default_progress_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Monitor {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_health_check_interval_seconds")]
    pub health_check_interval_seconds: u64,
    /// Re-open the subscription when the node closes it
    #[serde(default = "default_true")]
    pub restart_on_exhaustion: bool,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,
}

fn default_channel_capacity() -> usize {
    1024
}
fn default_health_check_interval_seconds() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_reconnect_delay_ms() -> u64 {
    1_000
}
fn default_max_reconnect_delay_ms() -> u64 {
    60_000
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            health_check_interval_seconds: default_health_check_interval_seconds(),
            restart_on_exhaustion: default_true(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
        }
    }
}

impl Monitor {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_seconds)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub rpc: Rpc,
    #[serde(default)]
    pub factory: Factory,
    #[serde(default)]
    pub enumeration: Enumeration,
    #[serde(default)]
    pub monitor: Monitor,
    #[serde(default)]
    pub log: LogSettings,
}

impl Settings {
    /// Loads `Config.toml` from the working directory if present, then environment
    /// overrides. Does not validate; call [`Settings::validate`] once CLI overrides are in.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Like [`Settings::new`], but reads `path` instead of `Config.toml`. The file is
    /// required when a path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_layers(path, ENV_PREFIX, BLOCKCHAIN_URL_ENV)
    }

    fn load_layers(
        path: Option<&Path>,
        env_prefix: &str,
        url_var: &str,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("Config").required(false),
        };

        let s = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(env_prefix).separator("__"))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        // Same variable the original console tool used for the node endpoint
        if let Ok(url) = env::var(url_var) {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                settings.rpc.url = trimmed.to_string();
            }
        }

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc.url.trim().is_empty() {
            return Err(ConfigError::Message(format!(
                "need blockchain url: set rpc.url or {}",
                BLOCKCHAIN_URL_ENV
            )));
        }
        if self.enumeration.max_concurrency == 0 {
            return Err(ConfigError::Message(
                "enumeration.max_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.monitor.reconnect_delay_ms == 0 {
            return Err(ConfigError::Message(
                "monitor.reconnect_delay_ms must be greater than 0".to_string(),
            ));
        }
        self.factory_address()?;
        Ok(())
    }

    pub fn factory_address(&self) -> Result<Address, ConfigError> {
        Address::from_str(self.factory.address.trim()).map_err(|e| {
            ConfigError::Message(format!(
                "invalid factory.address '{}': {}",
                self.factory.address, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_match_reference_deployment() {
        let settings = Settings::default();

        assert_eq!(settings.enumeration.max_concurrency, 250);
        assert_eq!(
            settings.factory_address().unwrap(),
            Address::from_str(DEFAULT_FACTORY_ADDRESS).unwrap()
        );
        assert!(settings.monitor.restart_on_exhaustion);
        assert_eq!(settings.monitor.reconnect_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_reads_sections_and_keeps_defaults() {
        let file = write_config(
            r#"
            [rpc]
            url = "ws://10.0.0.5:8546"

            [enumeration]
            max_concurrency = 64

            [monitor]
            restart_on_exhaustion = false
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();

        assert_eq!(settings.enumeration.max_concurrency, 64);
        assert_eq!(settings.enumeration.progress_interval, 1000);
        assert!(!settings.monitor.restart_on_exhaustion);
        assert_eq!(settings.monitor.channel_capacity, 1024);
        assert_eq!(settings.factory.address, DEFAULT_FACTORY_ADDRESS);
    }

    #[test]
    fn test_load_requires_explicit_file() {
        let missing = Path::new("/nonexistent/pair-monitor/Config.toml");
        assert!(Settings::load(Some(missing)).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_url_and_zero_concurrency() {
        let mut settings = Settings::default();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("need blockchain url"));

        settings.rpc.url = "ws://127.0.0.1:8546".to_string();
        settings.enumeration.max_concurrency = 0;
        assert!(settings.validate().is_err());

        settings.enumeration.max_concurrency = 10;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_reconnect_delay() {
        let mut settings = Settings::default();
        settings.rpc.url = "ws://127.0.0.1:8546".to_string();
        settings.monitor.reconnect_delay_ms = 0;

        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("reconnect_delay_ms"));
    }

    #[test]
    fn test_environment_overrides_file() {
        // Private names so parallel tests reading the real variables are unaffected.
        let prefix = "PAIR_MONITOR_LAYERING_TEST";
        let url_var = "PAIR_MONITOR_LAYERING_TEST_URL";
        let overrides = [
            ("PAIR_MONITOR_LAYERING_TEST__ENUMERATION__MAX_CONCURRENCY", "17"),
            ("PAIR_MONITOR_LAYERING_TEST__MONITOR__RESTART_ON_EXHAUSTION", "false"),
            (url_var, "  ws://1.2.3.4:8546  "),
        ];
        let file = write_config(
            r#"
            [rpc]
            url = "ws://10.0.0.5:8546"

            [enumeration]
            max_concurrency = 64
            "#,
        );

        for (key, value) in overrides {
            env::set_var(key, value);
        }
        let loaded = Settings::load_layers(Some(file.path()), prefix, url_var);
        for (key, _) in overrides {
            env::remove_var(key);
        }
        let settings = loaded.unwrap();

        assert_eq!(settings.enumeration.max_concurrency, 17);
        assert!(!settings.monitor.restart_on_exhaustion);
        assert_eq!(settings.rpc.url, "ws://1.2.3.4:8546");
        assert_eq!(settings.enumeration.progress_interval, 1000);
    }

    #[test]
    fn test_blank_url_variable_keeps_configured_url() {
        let url_var = "PAIR_MONITOR_BLANK_URL_TEST";
        let file = write_config(
            r#"
            [rpc]
            url = "ws://10.0.0.5:8546"
            "#,
        );

        env::set_var(url_var, "   ");
        let loaded = Settings::load_layers(Some(file.path()), url_var, url_var);
        env::remove_var(url_var);

        assert_eq!(loaded.unwrap().rpc.url, "ws://10.0.0.5:8546");
    }

    #[test]
    fn test_validate_rejects_bad_factory_address() {
        let mut settings = Settings::default();
        settings.rpc.url = "ws://127.0.0.1:8546".to_string();
        settings.factory.address = "0x1234".to_string();

        assert!(settings.validate().is_err());
    }
}
