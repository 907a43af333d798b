// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Store configuration.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

pub const ENV_FILE_PATH: &str = "ECHO_LOG_FILE_PATH";
pub const ENV_CLOSE_ON_IDLE: &str = "ECHO_LOG_CLOSE_ON_IDLE";
pub const ENV_SYNC_ON_WRITE: &str = "ECHO_LOG_SYNC_ON_WRITE";
pub const ENV_DECODE_POLICY: &str = "ECHO_LOG_DECODE_POLICY";

/// What to do with a stored line that does not decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Fail the whole read with `LogError::Decode`.
    #[default]
    Strict,
    /// Drop the line, log a warning and keep going.
    Skip,
}

impl FromStr for DecodePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(DecodePolicy::Strict),
            "skip" => Ok(DecodePolicy::Skip),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Log file location. Created on first use.
    pub path: PathBuf,
    /// Close the descriptor whenever the task queue runs dry. The next
    /// operation reopens it.
    pub close_on_idle: bool,
    /// fsync data after every append.
    pub sync_on_write: bool,
    pub decode_policy: DecodePolicy,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            close_on_idle: true,
            sync_on_write: false,
            decode_policy: DecodePolicy::Strict,
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = lookup(ENV_FILE_PATH)
            .filter(|p| !p.trim().is_empty())
            .ok_or(ConfigError::MissingVar(ENV_FILE_PATH))?;

        let mut cfg = Self::new(path);
        if let Some(value) = lookup(ENV_CLOSE_ON_IDLE) {
            cfg.close_on_idle = parse_var(ENV_CLOSE_ON_IDLE, value)?;
        }
        if let Some(value) = lookup(ENV_SYNC_ON_WRITE) {
            cfg.sync_on_write = parse_var(ENV_SYNC_ON_WRITE, value)?;
        }
        if let Some(value) = lookup(ENV_DECODE_POLICY) {
            cfg.decode_policy = parse_var(ENV_DECODE_POLICY, value)?;
        }
        Ok(cfg)
    }
}

pub fn parse_var<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidVar { name, value })
}
