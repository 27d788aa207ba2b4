use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize, Debug)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Deserialize, Debug)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Queue service location. Credentials come from the ambient AWS credential
/// chain, never from this file.
#[derive(Deserialize, Debug)]
pub struct QueueConfig {
    pub url: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    #[serde(default = "default_max_messages")]
    pub max_messages: i32,
    // Queue-side long-poll wait; independent of the relay's own sleep.
    #[serde(default = "default_wait_time_secs")]
    pub wait_time_secs: i32,
}

#[derive(Deserialize, Debug)]
pub struct StoreConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            bucket: default_bucket(),
            region: None,
            endpoint: None,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RelayConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub queue: QueueConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.validate()?;

        Ok(config)
    }

    // SQS rejects out-of-range receive parameters on every call, which
    // would turn each poll into a logged transient error forever. Better
    // to refuse the config at startup.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=10).contains(&self.queue.max_messages) {
            return Err(ConfigError::Invalid(format!(
                "queue.max_messages must be between 1 and 10, got {}",
                self.queue.max_messages
            )));
        }
        if !(0..=20).contains(&self.queue.wait_time_secs) {
            return Err(ConfigError::Invalid(format!(
                "queue.wait_time_secs must be between 0 and 20, got {}",
                self.queue.wait_time_secs
            )));
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn default_max_messages() -> i32 {
    10
}

fn default_wait_time_secs() -> i32 {
    20
}

fn default_bucket() -> String {
    "app-data-bucket".into()
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    30
}
