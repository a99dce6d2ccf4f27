use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

/// A one-shot scheduled task with idempotent arming.
///
/// The debouncer is either idle or armed. `arm` while armed is a no-op, not a
/// reschedule: the window runs from the first arm and the action fires exactly
/// once for any burst of triggers inside it. Arming again after (or while)
/// the action runs starts a fresh window.
///
/// Used for coalescing snapshot writes and party-list broadcasts.
pub struct Debouncer {
    armed: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<()>,
}

impl Debouncer {
    /// Spawn the background task driving the window. Requires a tokio
    /// runtime; the task ends when the debouncer is dropped.
    pub fn new<F>(window: Duration, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let armed = Arc::new(AtomicBool::new(false));
        let task_armed = armed.clone();

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tokio::time::sleep(window).await;
                // Disarm before firing so triggers raised by the action
                // itself start a new window instead of being lost.
                task_armed.store(false, Ordering::SeqCst);
                action();
            }
        });

        Self { armed, tx }
    }

    /// Arm the timer. Does nothing when a firing is already pending.
    pub fn arm(&self) {
        if self.armed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn burst_of_arms_fires_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let task_count = count.clone();
        let debouncer = Debouncer::new(Duration::from_millis(20), move || {
            task_count.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..5 {
            debouncer.arm();
        }
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rearming_after_fire_fires_again() {
        let count = Arc::new(AtomicUsize::new(0));
        let task_count = count.clone();
        let debouncer = Debouncer::new(Duration::from_millis(10), move || {
            task_count.fetch_add(1, Ordering::SeqCst);
        });

        debouncer.arm();
        tokio::time::sleep(Duration::from_millis(50)).await;
        debouncer.arm();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unarmed_debouncer_never_fires() {
        let count = Arc::new(AtomicUsize::new(0));
        let task_count = count.clone();
        let _debouncer = Debouncer::new(Duration::from_millis(10), move || {
            task_count.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
