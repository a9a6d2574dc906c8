//! Export watcher: wait for the renderer to materialize an exported image.
//!
//! Image export is a side effect of dispatch; the renderer writes the file on
//! its own schedule. The watcher polls for existence at a fixed interval with
//! a bounded budget and yields between polls, so concurrent dispatch calls
//! are never blocked. A timeout is silent: callers must not assume the export
//! succeeded just because the watch returned.

use log::{debug, warn};
use std::path::Path;
use std::time::Duration;

/// Default spacing between existence checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Default number of polls before giving up.
pub const DEFAULT_MAX_POLLS: u32 = 50;

/// Outcome of an export watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportResult {
    /// The file appeared (possibly before the first poll).
    Found,
    /// The retry budget ran out without the file appearing.
    TimedOut,
}

/// Polling parameters for a single export watch.
#[derive(Debug, Clone)]
pub struct ExportWatch {
    pub poll_interval: Duration,
    pub max_polls: u32,
    /// Open the file with the platform opener once it appears.
    pub open_on_found: bool,
}

impl Default for ExportWatch {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
            open_on_found: false,
        }
    }
}

impl ExportWatch {
    /// Wait for `path` to exist.
    ///
    /// Checks once up front (zero polls when the file is already there), then
    /// sleeps and re-checks at most `max_polls` times. Never errors; the
    /// timeout is only observable through the return value.
    pub async fn watch(&self, path: &Path) -> ExportResult {
        if path.exists() {
            self.handle_found(path);
            return ExportResult::Found;
        }

        for _ in 0..self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            if path.exists() {
                self.handle_found(path);
                return ExportResult::Found;
            }
        }

        debug!(
            "export {} did not appear after {} polls",
            path.display(),
            self.max_polls
        );
        ExportResult::TimedOut
    }

    fn handle_found(&self, path: &Path) {
        debug!("export ready: {}", path.display());
        if self.open_on_found {
            if let Err(err) = open::that_detached(path) {
                warn!("failed to open exported file {}: {err}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn quick_watch(max_polls: u32) -> ExportWatch {
        ExportWatch {
            poll_interval: Duration::from_millis(1),
            max_polls,
            open_on_found: false,
        }
    }

    #[tokio::test]
    async fn existing_file_is_found_without_polling() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = quick_watch(0).watch(file.path()).await;
        assert_eq!(result, ExportResult::Found);
    }

    #[tokio::test]
    async fn times_out_after_exactly_max_polls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.png");

        let start = Instant::now();
        let result = quick_watch(3).watch(&path).await;
        assert_eq!(result, ExportResult::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(3));
    }

    #[tokio::test]
    async fn file_created_mid_watch_is_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");

        let writer = {
            let path = path.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                std::fs::write(&path, b"png").unwrap();
            })
        };

        let watch = ExportWatch {
            poll_interval: Duration::from_millis(5),
            max_polls: DEFAULT_MAX_POLLS,
            open_on_found: false,
        };
        let result = watch.watch(&path).await;
        writer.await.unwrap();
        assert_eq!(result, ExportResult::Found);
    }

    #[tokio::test]
    async fn concurrent_watches_do_not_interfere() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.png");
        std::fs::write(&present, b"png").unwrap();
        let absent = dir.path().join("b.png");

        let watch_a = quick_watch(3);
        let watch_b = quick_watch(3);
        let (a, b) = tokio::join!(watch_a.watch(&present), watch_b.watch(&absent));
        assert_eq!(a, ExportResult::Found);
        assert_eq!(b, ExportResult::TimedOut);
    }
}
