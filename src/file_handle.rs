// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Single-file handle with an explicit open/close state machine.
//!
//! ```text
//! Closed     --open(Append)--> Append
//! Closed     --open(Read)----> Read
//! Append     --close()-------> Closed
//! Read       --close()-------> Closed
//! ```
//!
//! Switching between `Append` and `Read` always goes through `Closed`.
//! The OS descriptor only exists inside the `Open` state.

use std::collections::VecDeque;
use std::fmt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::error::{LogError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Append,
    Read,
}

/// Externally visible state of a [`FileHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStatus {
    Closed,
    Open(FileMode),
}

impl fmt::Display for HandleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleStatus::Closed => f.write_str("closed"),
            HandleStatus::Open(FileMode::Append) => f.write_str("open-append"),
            HandleStatus::Open(FileMode::Read) => f.write_str("open-read"),
        }
    }
}

/// Which lines to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRange {
    /// Zero-based line indices in `[start, end)`.
    Bounded { start: u64, end: u64 },
    /// The last `n` lines of the file.
    Tail(usize),
}

impl LineRange {
    /// True when the range can never select a line, so no scan is needed.
    pub fn is_empty(&self) -> bool {
        match *self {
            LineRange::Bounded { start, end } => end <= start,
            LineRange::Tail(count) => count == 0,
        }
    }
}

/// Raw lines returned by [`FileHandle::read_lines`], in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBatch {
    /// Absolute index of `lines[0]` in the file.
    pub first_line: u64,
    pub lines: Vec<String>,
}

enum HandleState {
    Closed,
    Open { mode: FileMode, file: File },
}

impl HandleState {
    fn status(&self) -> HandleStatus {
        match self {
            HandleState::Closed => HandleStatus::Closed,
            HandleState::Open { mode, .. } => HandleStatus::Open(*mode),
        }
    }
}

pub struct FileHandle {
    path: PathBuf,
    state: HandleState,
    sync_on_write: bool,
    open_count: u64,
    state_violations: u64,
}

impl FileHandle {
    /// Create a closed handle. Nothing touches the filesystem until the first
    /// append or read.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: HandleState::Closed,
            sync_on_write: false,
            open_count: 0,
            state_violations: 0,
        }
    }

    /// Call `sync_data` after every append.
    pub fn with_sync_on_write(mut self, sync_on_write: bool) -> Self {
        self.sync_on_write = sync_on_write;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> HandleStatus {
        self.state.status()
    }

    /// Number of times a descriptor has been opened.
    pub fn open_count(&self) -> u64 {
        self.open_count
    }

    /// Number of invalid `close()` calls observed.
    pub fn state_violations(&self) -> u64 {
        self.state_violations
    }

    /// Open the file in `mode`, creating it (and missing parent directories)
    /// first. The handle must be closed.
    pub async fn open(&mut self, mode: FileMode) -> Result<()> {
        if let HandleState::Open { .. } = self.state {
            return Err(LogError::InvalidState {
                expected: HandleStatus::Closed,
                found: self.status(),
            });
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let file = match mode {
            FileMode::Append => {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .await?
            }
            FileMode::Read => {
                if !fs::try_exists(&self.path).await? {
                    OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(&self.path)
                        .await?;
                }
                OpenOptions::new().read(true).open(&self.path).await?
            }
        };

        self.state = HandleState::Open { mode, file };
        self.open_count += 1;
        debug!(path = %self.path.display(), ?mode, "Opened log file");
        Ok(())
    }

    /// Append `data` verbatim, switching into append mode if needed.
    ///
    /// A failed write leaves the handle closed so the next operation starts
    /// from a fresh descriptor.
    pub async fn append(&mut self, data: &str) -> Result<()> {
        self.ensure_mode(FileMode::Append).await?;

        let sync = self.sync_on_write;
        let file = self.file_mut(FileMode::Append)?;
        let written = write_through(file, data.as_bytes(), sync).await;

        if let Err(e) = &written {
            warn!(path = %self.path.display(), error = %e, "Append failed, dropping descriptor");
            self.state = HandleState::Closed;
        }
        Ok(written?)
    }

    /// Read `range` from the start of the file, switching into read mode if
    /// needed. Empty ranges return immediately without touching the handle.
    pub async fn read_lines(&mut self, range: LineRange) -> Result<LineBatch> {
        if range.is_empty() {
            return Ok(LineBatch::default());
        }

        self.ensure_mode(FileMode::Read).await?;

        let file = self.file_mut(FileMode::Read)?;
        file.seek(SeekFrom::Start(0)).await?;
        let mut lines = BufReader::new(file).lines();

        match range {
            LineRange::Tail(count) => {
                let mut window = VecDeque::with_capacity(count.min(1024));
                let mut total = 0u64;
                while let Some(line) = lines.next_line().await? {
                    window.push_back(line);
                    total += 1;
                    if window.len() > count {
                        window.pop_front();
                    }
                }
                Ok(LineBatch {
                    first_line: total - window.len() as u64,
                    lines: window.into(),
                })
            }
            LineRange::Bounded { start, end } => {
                let mut collected = Vec::new();
                let mut index = 0u64;
                // Stop as soon as `end` is reached; the rest of the file is never read.
                while index < end {
                    let Some(line) = lines.next_line().await? else {
                        break;
                    };
                    if index >= start {
                        collected.push(line);
                    }
                    index += 1;
                }
                Ok(LineBatch {
                    first_line: start,
                    lines: collected,
                })
            }
        }
    }

    /// Release the descriptor.
    ///
    /// Closing an already-closed handle is reported and counted but not
    /// treated as an error; the handle ends up closed either way.
    pub async fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, HandleState::Closed) {
            HandleState::Closed => {
                self.state_violations += 1;
                warn!(
                    path = %self.path.display(),
                    expected = "open",
                    found = %HandleStatus::Closed,
                    "File handle found in an invalid state, handle will be reset"
                );
                Ok(())
            }
            HandleState::Open { mode, mut file } => {
                let flushed = match mode {
                    FileMode::Append => file.flush().await,
                    FileMode::Read => Ok(()),
                };
                drop(file);
                debug!(path = %self.path.display(), ?mode, "Closed log file");
                Ok(flushed?)
            }
        }
    }

    /// Transition into `mode`, closing first when open in the other mode.
    async fn ensure_mode(&mut self, mode: FileMode) -> Result<()> {
        match self.status() {
            HandleStatus::Open(current) if current == mode => Ok(()),
            HandleStatus::Open(current) => {
                debug!(from = ?current, to = ?mode, "Switching file mode");
                self.close().await?;
                self.open(mode).await
            }
            HandleStatus::Closed => self.open(mode).await,
        }
    }

    fn file_mut(&mut self, mode: FileMode) -> Result<&mut File> {
        let found = self.status();
        match &mut self.state {
            HandleState::Open { mode: current, file } if *current == mode => Ok(file),
            _ => Err(LogError::InvalidState {
                expected: HandleStatus::Open(mode),
                found,
            }),
        }
    }
}

async fn write_through(file: &mut File, data: &[u8], sync: bool) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.flush().await?;
    if sync {
        file.sync_data().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn write_lines(handle: &mut FileHandle, count: usize) {
        for i in 0..count {
            handle.append(&format!("line-{i}\n")).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_starts_closed() {
        let dir = tempdir().unwrap();
        let handle = FileHandle::new(dir.path().join("log.jsonl"));
        assert_eq!(handle.status(), HandleStatus::Closed);
        assert_eq!(handle.open_count(), 0);
        assert!(!dir.path().join("log.jsonl").exists());
    }

    #[tokio::test]
    async fn test_open_requires_closed() {
        let dir = tempdir().unwrap();
        let mut handle = FileHandle::new(dir.path().join("log.jsonl"));

        handle.open(FileMode::Append).await.unwrap();
        let err = handle.open(FileMode::Read).await.unwrap_err();
        assert!(matches!(
            err,
            LogError::InvalidState {
                expected: HandleStatus::Closed,
                found: HandleStatus::Open(FileMode::Append),
            }
        ));
        assert_eq!(handle.status(), HandleStatus::Open(FileMode::Append));
    }

    #[tokio::test]
    async fn test_append_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("log.jsonl");
        let mut handle = FileHandle::new(&path);

        handle.append("hello\n").await.unwrap();
        handle.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let mut handle = FileHandle::new(&path);

        let batch = handle.read_lines(LineRange::Tail(10)).await.unwrap();
        assert!(batch.lines.is_empty());
        assert!(path.exists());
        assert_eq!(handle.status(), HandleStatus::Open(FileMode::Read));
    }

    #[tokio::test]
    async fn test_mode_switch_reopens() {
        let dir = tempdir().unwrap();
        let mut handle = FileHandle::new(dir.path().join("log.jsonl"));

        handle.append("a\n").await.unwrap();
        assert_eq!(handle.open_count(), 1);

        // Same mode keeps the descriptor.
        handle.append("b\n").await.unwrap();
        assert_eq!(handle.open_count(), 1);

        let batch = handle.read_lines(LineRange::Tail(5)).await.unwrap();
        assert_eq!(batch.lines, vec!["a", "b"]);
        assert_eq!(handle.status(), HandleStatus::Open(FileMode::Read));
        assert_eq!(handle.open_count(), 2);

        handle.append("c\n").await.unwrap();
        assert_eq!(handle.status(), HandleStatus::Open(FileMode::Append));
        assert_eq!(handle.open_count(), 3);

        let batch = handle.read_lines(LineRange::Tail(1)).await.unwrap();
        assert_eq!(batch.lines, vec!["c"]);
        assert_eq!(batch.first_line, 2);
    }

    #[tokio::test]
    async fn test_repeated_reads_rewind() {
        let dir = tempdir().unwrap();
        let mut handle = FileHandle::new(dir.path().join("log.jsonl"));
        write_lines(&mut handle, 3).await;

        let first = handle.read_lines(LineRange::Tail(3)).await.unwrap();
        let second = handle.read_lines(LineRange::Tail(3)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.lines.len(), 3);
    }

    #[tokio::test]
    async fn test_tail_shorter_file() {
        let dir = tempdir().unwrap();
        let mut handle = FileHandle::new(dir.path().join("log.jsonl"));
        write_lines(&mut handle, 2).await;

        let batch = handle.read_lines(LineRange::Tail(10)).await.unwrap();
        assert_eq!(batch.lines, vec!["line-0", "line-1"]);
        assert_eq!(batch.first_line, 0);
    }

    #[tokio::test]
    async fn test_bounded_range() {
        let dir = tempdir().unwrap();
        let mut handle = FileHandle::new(dir.path().join("log.jsonl"));
        write_lines(&mut handle, 6).await;

        let batch = handle
            .read_lines(LineRange::Bounded { start: 2, end: 4 })
            .await
            .unwrap();
        assert_eq!(batch.lines, vec!["line-2", "line-3"]);
        assert_eq!(batch.first_line, 2);

        let batch = handle
            .read_lines(LineRange::Bounded { start: 4, end: 100 })
            .await
            .unwrap();
        assert_eq!(batch.lines, vec!["line-4", "line-5"]);

        let batch = handle
            .read_lines(LineRange::Bounded { start: 10, end: 20 })
            .await
            .unwrap();
        assert!(batch.lines.is_empty());
    }

    #[tokio::test]
    async fn test_bounded_stops_at_end() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        // A trailing line that is not valid UTF-8 would fail the scan if it were read.
        let mut bytes = b"zero\none\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        std::fs::write(&path, bytes).unwrap();

        let mut handle = FileHandle::new(&path);
        let batch = handle
            .read_lines(LineRange::Bounded { start: 0, end: 2 })
            .await
            .unwrap();
        assert_eq!(batch.lines, vec!["zero", "one"]);

        assert!(handle.read_lines(LineRange::Tail(5)).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_range_does_not_touch_handle() {
        let dir = tempdir().unwrap();
        let mut handle = FileHandle::new(dir.path().join("log.jsonl"));
        handle.append("a\n").await.unwrap();

        for range in [
            LineRange::Bounded { start: 3, end: 3 },
            LineRange::Bounded { start: 5, end: 1 },
            LineRange::Tail(0),
        ] {
            let batch = handle.read_lines(range).await.unwrap();
            assert!(batch.lines.is_empty());
        }

        assert_eq!(handle.status(), HandleStatus::Open(FileMode::Append));
        assert_eq!(handle.open_count(), 1);
    }

    #[tokio::test]
    async fn test_close_when_closed_is_reported() {
        let dir = tempdir().unwrap();
        let mut handle = FileHandle::new(dir.path().join("log.jsonl"));

        handle.close().await.unwrap();
        assert_eq!(handle.status(), HandleStatus::Closed);
        assert_eq!(handle.state_violations(), 1);

        handle.append("a\n").await.unwrap();
        handle.close().await.unwrap();
        handle.close().await.unwrap();
        assert_eq!(handle.status(), HandleStatus::Closed);
        assert_eq!(handle.state_violations(), 2);
    }

    #[tokio::test]
    async fn test_open_invalid_path_is_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let mut handle = FileHandle::new(blocker.join("log.jsonl"));
        let err = handle.append("a\n").await.unwrap_err();
        assert!(matches!(err, LogError::Io(_)));
        assert_eq!(handle.status(), HandleStatus::Closed);
    }

    #[tokio::test]
    async fn test_file_access_requires_matching_mode() {
        let dir = tempdir().unwrap();
        let mut handle = FileHandle::new(dir.path().join("log.jsonl"));

        let err = handle.file_mut(FileMode::Read).unwrap_err();
        assert!(matches!(
            err,
            LogError::InvalidState {
                expected: HandleStatus::Open(FileMode::Read),
                found: HandleStatus::Closed,
            }
        ));

        handle.open(FileMode::Append).await.unwrap();
        assert!(handle.file_mut(FileMode::Append).is_ok());
        let err = handle.file_mut(FileMode::Read).unwrap_err();
        assert!(matches!(
            err,
            LogError::InvalidState {
                found: HandleStatus::Open(FileMode::Append),
                ..
            }
        ));
        assert_eq!(handle.status(), HandleStatus::Open(FileMode::Append));
    }
}
