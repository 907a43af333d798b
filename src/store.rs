// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Log Store - append and range reads over a single log file.
//!
//! Every file operation is a task on one [`TaskQueue`] that owns the
//! [`FileHandle`]. Operations therefore run in exactly the order they were
//! submitted: a read submitted after an append observes that append, and two
//! operations can never race on the handle's mode switch.
//!
//! All operations enqueue their task when called and return a future for
//! the result, so call order is execution order even if the futures are
//! awaited in a different order.

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{DecodePolicy, StoreConfig};
use crate::entry::Entry;
use crate::error::Result;
use crate::file_handle::{FileHandle, HandleStatus, LineBatch, LineRange};
use crate::task_queue::TaskQueue;

/// Point-in-time view of the file handle, taken from inside the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleStats {
    pub status: HandleStatus,
    pub open_count: u64,
    pub state_violations: u64,
}

pub struct LogStore {
    queue: TaskQueue<FileHandle>,
    config: StoreConfig,
    skipped_lines: Arc<AtomicU64>,
}

impl LogStore {
    /// Create the store and start its queue worker. The log file itself is
    /// not touched until the first operation.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn open(config: StoreConfig) -> Self {
        let handle = FileHandle::new(&config.path).with_sync_on_write(config.sync_on_write);

        let mut builder = TaskQueue::builder(handle);
        if config.close_on_idle {
            builder = builder.on_drain(|handle| {
                Box::pin(async move {
                    if handle.status() == HandleStatus::Closed {
                        return;
                    }
                    if let Err(e) = handle.close().await {
                        warn!(error = %e, "Failed to close log file on idle");
                    }
                })
            });
        }

        info!(
            path = %config.path.display(),
            close_on_idle = config.close_on_idle,
            sync_on_write = config.sync_on_write,
            "Opening log store"
        );

        Self {
            queue: builder.spawn(),
            config,
            skipped_lines: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Lines dropped so far under [`DecodePolicy::Skip`].
    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines.load(Ordering::Relaxed)
    }

    /// Encode `entry` and append it as one line.
    pub fn append(&self, entry: &Entry) -> impl Future<Output = Result<()>> + Send + 'static {
        let queued = entry.encode().map(|line| {
            self.queue
                .execute(move |handle| Box::pin(async move { handle.append(&line).await }))
        });

        async move {
            queued?.await??;
            Ok(())
        }
    }

    /// Entries on lines `[start, end)`. Empty when `end <= start` or when the
    /// range lies past the end of the file.
    pub fn read_range(
        &self,
        start: u64,
        end: u64,
    ) -> impl Future<Output = Result<Vec<Entry>>> + Send + 'static {
        self.read(LineRange::Bounded { start, end })
    }

    /// The last `count` entries, or all of them when the file is shorter.
    pub fn tail(&self, count: usize) -> impl Future<Output = Result<Vec<Entry>>> + Send + 'static {
        self.read(LineRange::Tail(count))
    }

    /// Undecoded lines for `range`.
    pub fn read_raw(&self, range: LineRange) -> impl Future<Output = Result<LineBatch>> + Send + 'static {
        let batch = self
            .queue
            .execute(move |handle| Box::pin(async move { handle.read_lines(range).await }));

        async move { batch.await? }
    }

    fn read(&self, range: LineRange) -> impl Future<Output = Result<Vec<Entry>>> + Send + 'static {
        let batch = self.read_raw(range);
        let policy = self.config.decode_policy;
        let skipped = self.skipped_lines.clone();

        async move {
            let batch = batch.await?;
            decode_batch(batch, policy, &skipped)
        }
    }

    pub fn handle_stats(&self) -> impl Future<Output = Result<HandleStats>> + Send + 'static {
        let stats = self.queue.execute(|handle| {
            Box::pin(async move {
                HandleStats {
                    status: handle.status(),
                    open_count: handle.open_count(),
                    state_violations: handle.state_violations(),
                }
            })
        });

        async move { Ok(stats.await?) }
    }

    /// Number of operations submitted but not finished.
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    /// Wait until every operation submitted so far has finished.
    pub async fn idle(&self) {
        self.queue.idle().await
    }

    /// Finish queued operations, stop the worker and close the file.
    /// Operations submitted afterwards fail with `QueueError::Closed`.
    pub async fn shutdown(&self) -> Result<()> {
        let mut handle = self.queue.shutdown().await?;
        if handle.status() != HandleStatus::Closed {
            handle.close().await?;
        }
        info!(path = %self.config.path.display(), "Log store shut down");
        Ok(())
    }
}

fn decode_batch(batch: LineBatch, policy: DecodePolicy, skipped: &AtomicU64) -> Result<Vec<Entry>> {
    let mut entries = Vec::with_capacity(batch.lines.len());

    for (offset, line) in batch.lines.iter().enumerate() {
        let index = batch.first_line + offset as u64;
        match Entry::decode(line, index) {
            Ok(entry) => entries.push(entry),
            Err(e) if policy == DecodePolicy::Skip => {
                skipped.fetch_add(1, Ordering::Relaxed);
                warn!(line = index, error = %e, "Skipping undecodable log line");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Attributes;
    use crate::error::{LogError, QueueError};
    use crate::file_handle::FileMode;
    use serde_json::json;
    use tempfile::tempdir;

    fn header_entry(name: &str) -> Entry {
        let mut headers = Attributes::new();
        headers.insert("x-name".into(), json!(name));
        Entry::new(Some(headers), None, None)
    }

    #[tokio::test]
    async fn test_append_then_read() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(StoreConfig::new(dir.path().join("log.jsonl")));

        let entry = header_entry("first");
        store.append(&entry).await.unwrap();

        let entries = store.tail(10).await.unwrap();
        assert_eq!(entries, vec![entry]);
    }

    #[tokio::test]
    async fn test_idle_close() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(StoreConfig::new(dir.path().join("log.jsonl")));

        store.append(&header_entry("a")).await.unwrap();
        store.idle().await;
        store.append(&header_entry("b")).await.unwrap();
        store.idle().await;

        // Each burst reopened the file after the previous drain closed it.
        let stats = store.handle_stats().await.unwrap();
        assert_eq!(stats.open_count, 2);
        assert_eq!(stats.state_violations, 0);
    }

    #[tokio::test]
    async fn test_keep_open_between_bursts() {
        let dir = tempdir().unwrap();
        let mut config = StoreConfig::new(dir.path().join("log.jsonl"));
        config.close_on_idle = false;
        let store = LogStore::open(config);

        store.append(&header_entry("a")).await.unwrap();
        store.idle().await;
        store.append(&header_entry("b")).await.unwrap();
        store.idle().await;

        let stats = store.handle_stats().await.unwrap();
        assert_eq!(stats.status, HandleStatus::Open(FileMode::Append));
        assert_eq!(stats.open_count, 1);
    }

    #[tokio::test]
    async fn test_strict_decode_fails_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let good = header_entry("ok");
        std::fs::write(&path, format!("{}garbage\n", good.encode().unwrap())).unwrap();

        let store = LogStore::open(StoreConfig::new(&path));
        let err = store.read_range(0, 2).await.unwrap_err();
        assert!(matches!(err, LogError::Decode { line: 1, .. }));

        // The valid line alone still reads fine.
        assert_eq!(store.read_range(0, 1).await.unwrap(), vec![good]);
    }

    #[tokio::test]
    async fn test_skip_decode_policy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let good = header_entry("ok");
        std::fs::write(&path, format!("garbage\n{}", good.encode().unwrap())).unwrap();

        let mut config = StoreConfig::new(&path);
        config.decode_policy = DecodePolicy::Skip;
        let store = LogStore::open(config);

        assert_eq!(store.tail(5).await.unwrap(), vec![good]);
        assert_eq!(store.skipped_lines(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_pending_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let store = LogStore::open(StoreConfig::new(&path));

        // Fire and forget; shutdown must still run them.
        for i in 0..5 {
            drop(store.append(&header_entry(&i.to_string())));
        }
        store.shutdown().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 5);

        let err = store.append(&header_entry("late")).await.unwrap_err();
        assert!(matches!(err, LogError::Queue(QueueError::Closed)));
    }

    #[tokio::test]
    async fn test_io_error_does_not_stop_queue() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let store = LogStore::open(StoreConfig::new(blocker.join("log.jsonl")));
        let first = store.append(&header_entry("a"));
        let second = store.tail(1);

        assert!(matches!(first.await, Err(LogError::Io(_))));
        assert!(matches!(second.await, Err(LogError::Io(_))));

        store.idle().await;
        assert_eq!(store.pending(), 0);
    }
}
