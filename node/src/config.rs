// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;

use echo_log::config::parse_var;
use echo_log::{ConfigError, StoreConfig};

pub const ENV_BIND_ADDR: &str = "ECHO_LOG_BIND_ADDR";

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreConfig,
}

impl NodeConfig {
    pub const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8080);

    pub fn new(store: StoreConfig) -> Self {
        Self {
            bind_addr: SocketAddr::from(Self::DEFAULT_BIND_ADDR),
            store,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = StoreConfig::from_lookup(&lookup)?;
        let mut cfg = Self::new(store);
        if let Some(value) = lookup(ENV_BIND_ADDR) {
            cfg.bind_addr = parse_var(ENV_BIND_ADDR, value)?;
        }
        Ok(cfg)
    }
}
