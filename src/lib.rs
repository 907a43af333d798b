// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! echo-log: an append-only, line-oriented log store over a single file.
//!
//! All file access goes through one FIFO [`task_queue::TaskQueue`] whose
//! worker owns the [`file_handle::FileHandle`], so appends and reads never
//! interleave.

pub mod config;
pub mod entry;
pub mod error;
pub mod file_handle;
pub mod store;
pub mod task_queue;

pub use config::{DecodePolicy, StoreConfig};
pub use entry::{Attributes, Entry};
pub use error::{ConfigError, LogError, QueueError, Result};
pub use file_handle::{FileHandle, FileMode, HandleStatus, LineBatch, LineRange};
pub use store::{HandleStats, LogStore};
pub use task_queue::{TaskQueue, TaskQueueBuilder};
