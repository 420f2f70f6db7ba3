// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DUMP_DIR: &str = "/tmp/memsampler";
pub const DEFAULT_SERVICE_NAME: &str = "memsampler";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
/// Longest accepted sampling interval, one day.
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub const ENV_DUMP_DIR: &str = "DD_MEMSAMPLER_DIR";
pub const ENV_INTERVAL_SECS: &str = "DD_MEMSAMPLER_INTERVAL_SECS";
pub const ENV_SERVICE_NAME: &str = "DD_MEMSAMPLER_SERVICE";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sampling interval must be greater than zero")]
    ZeroInterval,

    #[error("sampling interval {0:?} exceeds the maximum of one day")]
    IntervalTooLarge(Duration),

    #[error("invalid DD_MEMSAMPLER_INTERVAL_SECS value: {0:?}")]
    InvalidIntervalEnv(String),

    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("service name must not contain a path separator: {0:?}")]
    InvalidServiceName(String),
}

/// Collector settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Time between two samples
    pub interval: Duration,
    /// Directory receiving the dump file, created if missing
    pub dir: PathBuf,
    /// Leading part of the dump file name
    pub service_name: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            dir: PathBuf::from(DEFAULT_DUMP_DIR),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl CollectorConfig {
    /// Defaults overridden by `DD_MEMSAMPLER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var(ENV_DUMP_DIR) {
            config.dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var(ENV_INTERVAL_SECS) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidIntervalEnv(raw.clone()))?;
            config.interval = Duration::from_secs(secs);
        }
        if let Ok(name) = std::env::var(ENV_SERVICE_NAME) {
            config.service_name = name;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.interval > MAX_INTERVAL {
            return Err(ConfigError::IntervalTooLarge(self.interval));
        }
        if self.service_name.is_empty() {
            return Err(ConfigError::EmptyServiceName);
        }
        if self.service_name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidServiceName(self.service_name.clone()));
        }
        Ok(())
    }
}
