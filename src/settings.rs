use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Server {
    pub name: String,
    pub version: String,
    pub listen: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub run_migrations: bool,
}

/// Limits and timeouts handed to the referral services at construction.
#[derive(Debug, Clone, Deserialize)]
pub struct Referral {
    #[serde(default = "default_max_code_length")]
    pub max_code_length: usize,
    #[serde(default = "default_code_bytes")]
    pub code_bytes: usize,
    #[serde(default = "default_generation_attempts")]
    pub generation_attempts: u32,
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,
    #[serde(default = "default_aggregate_timeout_secs")]
    pub aggregate_timeout_secs: u64,
    #[serde(default = "default_page_limit")]
    pub default_page_limit: i64,
    /// When set, a storage fault while checking whether the referee already
    /// owns a code aborts the redemption instead of counting as "no code".
    #[serde(default)]
    pub strict_owner_check: bool,
}

impl Referral {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregate_timeout_secs)
    }

    /// Rejects limits the services divide by or loop over.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("referral.code_bytes", self.code_bytes as u64),
            ("referral.generation_attempts", u64::from(self.generation_attempts)),
            ("referral.default_page_limit", self.default_page_limit.max(0) as u64),
        ];

        match positive.iter().find(|(_, value)| *value == 0) {
            Some((key, _)) => Err(ConfigError::Message(format!("{key} must be at least 1"))),
            None => Ok(()),
        }
    }
}

impl Default for Referral {
    fn default() -> Self {
        Referral {
            max_code_length: default_max_code_length(),
            code_bytes: default_code_bytes(),
            generation_attempts: default_generation_attempts(),
            lookup_timeout_secs: default_lookup_timeout_secs(),
            aggregate_timeout_secs: default_aggregate_timeout_secs(),
            default_page_limit: default_page_limit(),
            strict_owner_check: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub auth: Auth,
    pub postgres: Postgres,
    #[serde(default)]
    pub referral: Referral,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("REFERRAL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.referral.validate()?;

        Ok(settings)
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_max_code_length() -> usize {
    20
}

fn default_code_bytes() -> usize {
    5
}

fn default_generation_attempts() -> u32 {
    10
}

fn default_lookup_timeout_secs() -> u64 {
    10
}

fn default_aggregate_timeout_secs() -> u64 {
    15
}

fn default_page_limit() -> i64 {
    10
}
