//! Log directory retention.
//!
//! A cancellable background task that bounds the aggregate size of rotated
//! log files by deleting the oldest first, plus an age-based prune pass run
//! once at setup.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::logger::Logger;
use crate::fields;

/// How often a started [`RetentionManager`] re-checks the log directory.
pub const RETENTION_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// A rotated log file observed during a cleanup pass. Recomputed on every
/// pass, never persisted.
#[derive(Debug, Clone)]
pub struct LogFileInfo {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

struct RunningTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Background task keeping the aggregate size of rotated log files under a
/// configured cap.
///
/// The cleanup pass is not coordinated with concurrent writes to the live
/// log file; it only ever targets files the rotation scheme has closed.
pub struct RetentionManager {
    dir: PathBuf,
    cap: u64,
    interval: Duration,
    pass_lock: Mutex<()>,
    task: Mutex<Option<RunningTask>>,
    logger: Logger,
}

impl RetentionManager {
    /// `cap` is the aggregate byte allowance for `.log`/`.gz` files under
    /// `dir`; 0 disables cleanup entirely and [`start`](Self::start)
    /// becomes a no-op.
    pub fn new(dir: PathBuf, cap: u64, interval: Duration, logger: Logger) -> Self {
        Self {
            dir,
            cap,
            interval,
            pass_lock: Mutex::new(()),
            task: Mutex::new(None),
            logger,
        }
    }

    /// Spawn the background task: one eager cleanup pass, then one pass per
    /// interval tick until [`stop`](Self::stop). Calling `start` while the
    /// task is already running is ignored with a warning.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(self: &Arc<Self>) {
        if self.cap == 0 {
            return;
        }
        let mut task = lock(&self.task);
        if task.is_some() {
            self.logger.warn("Log retention already running", &[]);
            return;
        }
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move { manager.run(shutdown_rx).await });
        *task = Some(RunningTask {
            shutdown: shutdown_tx,
            handle,
        });
    }

    /// Request cooperative cancellation and join the task. A no-op when the
    /// task was never started or already stopped. An in-progress cleanup
    /// pass is not interrupted; no pass runs after `stop` returns.
    pub async fn stop(&self) {
        let task = lock(&self.task).take();
        if let Some(task) = task {
            let _ = task.shutdown.send(());
            let _ = task.handle.await;
        }
    }

    /// Whether the background task is currently running.
    pub fn is_running(&self) -> bool {
        lock(&self.task).is_some()
    }

    async fn run(&self, mut shutdown: oneshot::Receiver<()>) {
        self.cleanup_pass();
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick completes immediately; the eager pass above
        // already covered it.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.cleanup_pass(),
            }
        }
    }

    /// One size-cap enforcement pass: walk the directory, and while the
    /// aggregate size of eligible files exceeds the cap and more than one
    /// file remains, delete the oldest by modification time.
    ///
    /// Mutually exclusive with itself; walk and delete failures are
    /// best-effort and skipped per entry.
    pub fn cleanup_pass(&self) {
        if self.cap == 0 {
            return;
        }
        let _guard = lock(&self.pass_lock);

        let mut files = Vec::new();
        collect_eligible(&self.dir, &mut files);

        let mut total: u64 = files.iter().map(|f| f.size).sum();
        if total <= self.cap {
            return;
        }

        files.sort_by_key(|f| f.modified);

        let mut remaining = files.len();
        for file in &files {
            if total <= self.cap || remaining <= 1 {
                break;
            }
            match fs::remove_file(&file.path) {
                Ok(()) => {
                    total -= file.size;
                    remaining -= 1;
                    self.logger.info(
                        "Removed rotated log file",
                        &fields! {
                            "path" => file.path.display().to_string(),
                            "size" => file.size,
                        },
                    );
                }
                // Skipped for this pass: its size stays counted and the
                // cursor moves on to the next-oldest candidate.
                Err(err) => self.logger.debug(
                    "Failed to remove rotated log file",
                    &fields! {
                        "path" => file.path.display().to_string(),
                        "err" => err.to_string(),
                    },
                ),
            }
        }
    }
}

/// Delete eligible files older than `max_age_days`, returning the number
/// deleted. Per-entry failures are skipped.
pub fn prune_expired(dir: &Path, max_age_days: u64) -> usize {
    if max_age_days == 0 || !dir.exists() {
        return 0;
    }
    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(max_age_days * 24 * 60 * 60))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut files = Vec::new();
    collect_eligible(dir, &mut files);

    let mut deleted = 0;
    for file in &files {
        if file.modified < cutoff && fs::remove_file(&file.path).is_ok() {
            deleted += 1;
        }
    }
    deleted
}

/// Only plain and gzip-compressed rotations qualify; everything else in the
/// directory is left alone.
fn is_eligible(path: &Path) -> bool {
    matches!(
        path.extension().and_then(OsStr::to_str),
        Some("log" | "gz")
    )
}

/// Recursively collect eligible files, skipping directories and unreadable
/// entries without aborting the walk.
fn collect_eligible(dir: &Path, out: &mut Vec<LogFileInfo>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if metadata.is_dir() {
            collect_eligible(&path, out);
            continue;
        }
        if !is_eligible(&path) {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        out.push(LogFileInfo {
            path,
            size: metadata.len(),
            modified,
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
