use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Snapshot of a running scan, handed to progress callbacks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub messages_seen: u64,
    pub messages_recorded: u64,
    pub channels_scanned: u64,
    pub channels_skipped: u64,
    pub elapsed_secs: u64,
}

/// Live counters updated by the map builder.
#[derive(Debug, Default)]
pub struct ScanProgress {
    pub messages_seen: AtomicU64,
    pub messages_recorded: AtomicU64,
    pub channels_scanned: AtomicU64,
    pub channels_skipped: AtomicU64,
}

impl ScanProgress {
    pub fn snapshot(&self, elapsed: Duration) -> ProgressSnapshot {
        ProgressSnapshot {
            messages_seen: self.messages_seen.load(Ordering::Relaxed),
            messages_recorded: self.messages_recorded.load(Ordering::Relaxed),
            channels_scanned: self.channels_scanned.load(Ordering::Relaxed),
            channels_skipped: self.channels_skipped.load(Ordering::Relaxed),
            elapsed_secs: elapsed.as_secs(),
        }
    }
}

/// Async callback invoked periodically while a scan runs.
pub type ProgressCallback =
    Arc<dyn Fn(ProgressSnapshot) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Aborts the ticker task when dropped, so a cancelled caller never leaks it.
struct TickerGuard(JoinHandle<()>);

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Drive `fut` to completion while `callback` fires every `interval`.
///
/// The first tick happens one full interval after the start; a scan that
/// finishes sooner never reports.
pub async fn with_progress<F, T>(
    fut: F,
    interval: Duration,
    progress: Arc<ScanProgress>,
    callback: Option<ProgressCallback>,
) -> T
where
    F: Future<Output = T>,
{
    let Some(callback) = callback else {
        return fut.await;
    };
    let interval = interval.max(Duration::from_millis(1));
    let started = tokio::time::Instant::now();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(started + interval, interval);
        loop {
            ticker.tick().await;
            let snapshot = progress.snapshot(started.elapsed());
            debug!(
                "Scan progress: {} messages seen, {} channels done",
                snapshot.messages_seen, snapshot.channels_scanned
            );
            callback(snapshot).await;
        }
    });
    let _guard = TickerGuard(handle);

    fut.await
}
