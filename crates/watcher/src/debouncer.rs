//! Change debouncing and coalescing
//!
//! Every recorded change re-arms a single shared timer. When the window passes
//! without further changes the debouncer stores one "rebuild due" permit, and
//! the consumer drains every pending change at once with [`ChangeDebouncer::take`].

use crate::events::PendingChange;
use bundlewatch_core::change::ChangeEvent;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{debug, trace};

/// Coalesces bursts of filesystem changes into rebuild triggers
pub struct ChangeDebouncer {
    /// Debounce window duration
    window: Duration,
    /// Map of paths to pending changes
    pending: Arc<DashMap<PathBuf, PendingChange>>,
    /// First-sighting counter
    next_seq: AtomicU64,
    /// Bumped on every record; a timer only fires if it is still current
    generation: Arc<AtomicU64>,
    ready: Arc<Notify>,
}

impl ChangeDebouncer {
    /// Create a new debouncer
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Arc::new(DashMap::new()),
            next_seq: AtomicU64::new(0),
            generation: Arc::new(AtomicU64::new(0)),
            ready: Arc::new(Notify::new()),
        }
    }

    /// Record a change and restart the debounce window
    ///
    /// Must be called from within a tokio runtime.
    pub fn record(&self, event: ChangeEvent) {
        let ChangeEvent { path, kind } = event;

        self.pending
            .entry(path.clone())
            .and_modify(|pending| {
                trace!("Coalescing {} for path: {:?}", kind, path);
                pending.update(kind);
            })
            .or_insert_with(|| {
                debug!("New {} change for path: {:?}", kind, path);
                PendingChange::new(kind, self.next_seq.fetch_add(1, Ordering::Relaxed))
            });

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let ready = Arc::clone(&self.ready);
        let window = self.window;

        tokio::spawn(async move {
            sleep(window).await;
            if current.load(Ordering::SeqCst) == generation {
                ready.notify_one();
            }
        });
    }

    /// Wait until the window has elapsed since the last recorded change
    ///
    /// At most one permit is stored, so several quiet periods that pass while
    /// nobody is waiting collapse into a single wakeup.
    pub async fn due(&self) {
        self.ready.notified().await;
    }

    /// Drain all pending changes, ordered by first sighting
    ///
    /// Changes recorded while draining are either returned here or stay
    /// pending with their own timer.
    pub fn take(&self) -> Vec<ChangeEvent> {
        let paths: Vec<PathBuf> = self
            .pending
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let mut drained: Vec<(PathBuf, PendingChange)> = paths
            .into_iter()
            .filter_map(|path| self.pending.remove(&path))
            .collect();
        drained.sort_by_key(|(_, pending)| pending.seq);

        if !drained.is_empty() {
            debug!(
                "Releasing {} debounced changes ({} notifications)",
                drained.len(),
                drained
                    .iter()
                    .map(|(_, p)| p.occurrence_count as u64)
                    .sum::<u64>()
            );
        }

        drained
            .into_iter()
            .map(|(path, pending)| ChangeEvent::new(path, pending.kind))
            .collect()
    }

    /// Get the number of pending paths
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Debounce window duration
    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlewatch_core::change::ChangeKind;
    use pretty_assertions::assert_eq;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_burst_coalesces_into_one_trigger() {
        let debouncer = ChangeDebouncer::new(Duration::from_millis(40));

        debouncer.record(ChangeEvent::new("a.js", ChangeKind::Create));
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.record(ChangeEvent::new("a.js", ChangeKind::Update));
        debouncer.record(ChangeEvent::new("b.js", ChangeKind::Update));

        timeout(Duration::from_secs(2), debouncer.due())
            .await
            .expect("debounce should fire");

        assert_eq!(
            debouncer.take(),
            vec![
                ChangeEvent::new("a.js", ChangeKind::Update),
                ChangeEvent::new("b.js", ChangeKind::Update),
            ]
        );
        assert_eq!(debouncer.pending_count(), 0);

        // Only one permit was stored for the whole burst
        assert!(timeout(Duration::from_millis(150), debouncer.due())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_window_restarts_on_each_record() {
        let debouncer = ChangeDebouncer::new(Duration::from_millis(80));

        debouncer.record(ChangeEvent::new("a.js", ChangeKind::Update));
        tokio::time::sleep(Duration::from_millis(50)).await;
        debouncer.record(ChangeEvent::new("a.js", ChangeKind::Update));

        // 50ms after the second record the window is still open
        assert!(timeout(Duration::from_millis(50), debouncer.due())
            .await
            .is_err());
        timeout(Duration::from_secs(2), debouncer.due())
            .await
            .expect("debounce should fire");
        assert_eq!(debouncer.take().len(), 1);
    }

    #[tokio::test]
    async fn test_changes_after_take_are_kept() {
        let debouncer = ChangeDebouncer::new(Duration::from_millis(20));

        debouncer.record(ChangeEvent::new("a.js", ChangeKind::Update));
        timeout(Duration::from_secs(2), debouncer.due())
            .await
            .expect("debounce should fire");
        assert_eq!(debouncer.take().len(), 1);

        debouncer.record(ChangeEvent::new("a.js", ChangeKind::Delete));
        timeout(Duration::from_secs(2), debouncer.due())
            .await
            .expect("debounce should fire again");
        assert_eq!(
            debouncer.take(),
            vec![ChangeEvent::new("a.js", ChangeKind::Delete)]
        );
    }

    #[test]
    fn test_take_on_empty_debouncer() {
        let debouncer = ChangeDebouncer::new(Duration::from_millis(20));
        assert!(debouncer.take().is_empty());
        assert_eq!(debouncer.window(), Duration::from_millis(20));
    }
}
