// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use std::io;
use thiserror::Error;

use crate::file_handle::HandleStatus;

/// Errors raised by the task queue itself, independent of what the tasks do.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was shut down and no longer accepts work.
    #[error("task queue is closed")]
    Closed,
    /// The task never reported a result (it panicked or was discarded).
    #[error("task was dropped before completing")]
    TaskDropped,
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid file handle state: expected {expected}, found {found}")]
    InvalidState {
        expected: HandleStatus,
        found: HandleStatus,
    },

    #[error("failed to encode entry: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode line {line}: {source}")]
    Decode {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub type Result<T> = std::result::Result<T, LogError>;

/// Startup configuration problems. Always fatal.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable \"{0}\" is not defined")]
    MissingVar(&'static str),

    #[error("environment variable \"{name}\" has invalid value \"{value}\"")]
    InvalidVar { name: &'static str, value: String },
}
