//! Configuration management for the Carestock service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with CARESTOCK_ prefix

use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Facility-local time settings
    pub facility: FacilityConfig,

    /// Scheduled job configuration
    pub jobs: JobsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key used to verify JWT tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FacilityConfig {
    /// Fixed offset of the care facility from UTC, in minutes
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JobsConfig {
    /// Run the scheduled jobs inside this process
    pub enabled: bool,

    /// Local time of the daily decay job, "HH:MM"
    pub decay_at: String,

    /// Local time of the daily dose schedule generator, "HH:MM"
    pub doses_at: String,

    /// Execution budget for one job run, in seconds
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("CARESTOCK_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("facility.utc_offset_minutes", -360)?
            .set_default("jobs.enabled", true)?
            .set_default("jobs.decay_at", "00:00")?
            .set_default("jobs.doses_at", "05:00")?
            .set_default("jobs.timeout_secs", 300)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (CARESTOCK_ prefix)
            .add_source(
                Environment::with_prefix("CARESTOCK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but are unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if FixedOffset::east_opt(self.facility.utc_offset_minutes * 60).is_none() {
            return Err(ConfigError::Message(format!(
                "facility.utc_offset_minutes out of range: {}",
                self.facility.utc_offset_minutes
            )));
        }
        parse_time_of_day("jobs.decay_at", &self.jobs.decay_at)?;
        parse_time_of_day("jobs.doses_at", &self.jobs.doses_at)?;
        if self.jobs.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "jobs.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The facility's fixed UTC offset
    pub fn facility_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.facility.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

impl JobsConfig {
    pub fn decay_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_time_of_day("jobs.decay_at", &self.decay_at)
    }

    pub fn doses_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_time_of_day("jobs.doses_at", &self.doses_at)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_time_of_day(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    shared::validate_time_of_day(value)
        .map_err(|e| ConfigError::Message(format!("{}: {}", key, e)))?;
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| ConfigError::Message(format!("{}: {}", key, e)))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            decay_at: "00:00".to_string(),
            doses_at: "05:00".to_string(),
            timeout_secs: 300,
        }
    }
}
