//! Streaming activation feed: stdin lines → bounded queue → single consumer.
//!
//! Each line is `<item-id> [unix-millis]`. Blank lines and lines starting
//! with `#` are ignored. Without a timestamp the event is stamped with the
//! current wall time when it is read.

use std::future::Future;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use trend_core::{Admission, ItemKey, MAX_WALL_TIME, SharedTracker, WallTime, now_unix_millis};
use trend_store::Store;

use crate::config::FeedConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    pub id: ItemKey,
    pub at: WallTime,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedSummary {
    pub recorded: u64,
    pub rejected: u64,
    pub skipped: u64,
    pub flushes: u64,
}

/// Parse one feed line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str, now: impl FnOnce() -> WallTime) -> Result<Option<FeedEvent>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let id = parts.next().and_then(|s| ItemKey::new(s)).ok_or("missing item id")?;
    let at = match parts.next() {
        Some(raw) => raw
            .parse::<WallTime>()
            .ok()
            .filter(|at| *at <= MAX_WALL_TIME)
            .ok_or_else(|| format!("invalid timestamp '{raw}'"))?,
        None => now(),
    };
    if parts.next().is_some() {
        return Err("trailing fields after timestamp".to_string());
    }
    Ok(Some(FeedEvent { id, at }))
}

// Runs on a plain OS thread: a blocked stdin read must not keep the
// runtime alive after shutdown.
fn spawn_reader<R>(
    input: R,
    tx: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
    skipped: Arc<AtomicU64>,
) -> std::io::Result<thread::JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("trend-feed-reader".to_string())
        .spawn(move || {
            for (idx, next) in input.lines().enumerate() {
                let line_no = idx + 1;
                if cancel.is_cancelled() {
                    break;
                }
                let line = match next {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!("feed input error at line {line_no}: {e}");
                        break;
                    }
                };

                match parse_line(&line, now_unix_millis) {
                    Ok(Some(event)) => {
                        if tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(reason) => {
                        skipped.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!("skipping feed line {line_no}: {reason}");
                    }
                }
            }
        })
}

/// Drain events until every sender is gone, or until `cancel` fires and the
/// already-queued events are applied.
async fn consume_events(
    mut rx: mpsc::Receiver<FeedEvent>,
    tracker: SharedTracker,
    cancel: CancellationToken,
) -> (u64, u64) {
    let mut recorded = 0;
    let mut rejected = 0;
    let mut closed = false;
    loop {
        let event = tokio::select! {
            next = rx.recv() => match next {
                Some(event) => event,
                None => break,
            },
            _ = cancel.cancelled(), if !closed => {
                rx.close();
                closed = true;
                continue;
            }
        };

        let outcome = tracker.record_activation(&event.id, event.at);
        match &outcome {
            Admission::Rejected => rejected += 1,
            Admission::Evicted { evicted } => {
                tracing::debug!("{} displaced {evicted}", event.id);
            }
            Admission::Inserted | Admission::Incremented => {}
        }
        recorded += 1;
        tracing::trace!(id = %event.id, at = event.at, ?outcome, "recorded activation");
    }
    (recorded, rejected)
}

fn flush(store: &Store, tracker: &SharedTracker) -> bool {
    let snapshot = tracker.snapshot();
    match store.save_snapshot(&snapshot) {
        Ok(()) => {
            tracing::info!("flushed {} trending items", snapshot.items.len());
            true
        }
        Err(e) => {
            tracing::error!("failed to flush trend snapshot: {e}");
            false
        }
    }
}

/// Run the feed until `input` is exhausted or `shutdown` resolves, flushing
/// periodically and once more at the end.
pub async fn run<R, S>(
    store: &Store,
    tracker: SharedTracker,
    config: &FeedConfig,
    input: R,
    shutdown: S,
) -> Result<FeedSummary>
where
    R: BufRead + Send + 'static,
    S: Future<Output = ()>,
{
    let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
    let cancel = CancellationToken::new();
    let skipped = Arc::new(AtomicU64::new(0));

    // Not joined: on shutdown the reader may stay blocked until process exit.
    spawn_reader(input, tx, cancel.clone(), skipped.clone())
        .context("failed to spawn feed reader")?;
    let mut consumer = tokio::spawn(consume_events(rx, tracker.clone(), cancel.clone()));

    let period = Duration::from_secs(config.flush_interval_secs.max(1));
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    let mut summary = FeedSummary::default();
    tokio::pin!(shutdown);

    let (recorded, rejected) = loop {
        tokio::select! {
            _ = ticker.tick() => {
                if flush(store, &tracker) {
                    summary.flushes += 1;
                }
            }
            _ = &mut shutdown, if !cancel.is_cancelled() => {
                tracing::info!("shutdown requested, draining feed queue");
                cancel.cancel();
            }
            done = &mut consumer => {
                break done.context("feed consumer task failed")?;
            }
        }
    };

    summary.skipped = skipped.load(Ordering::Relaxed);
    summary.recorded = recorded;
    summary.rejected = rejected;

    if flush(store, &tracker) {
        summary.flushes += 1;
    }
    Ok(summary)
}
