//! Sequential execution of queued hotkey actions.
//!
//! Non-instant hotkey actions land here and run strictly one at a time in
//! arrival order. An entry stays at the head of the queue until its action
//! has settled, so the next one never starts early.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{debug, error, warn};

use crate::action::HotkeyAction;

/// FIFO queue of pending hotkey actions with an idempotent drain loop.
#[derive(Debug, Default)]
pub struct PendingActionQueue {
    entries: Mutex<VecDeque<HotkeyAction>>,
    draining: AtomicBool,
}

impl PendingActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action to the tail of the queue.
    pub fn enqueue(&self, action: HotkeyAction) {
        let mut entries = self.lock();
        entries.push_back(action);
        debug!(pending = entries.len(), "queued hotkey action");
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Run queued actions until the queue is empty.
    ///
    /// Calling this while another drain is running returns immediately; the
    /// running drain picks up anything enqueued in the meantime. A failing or
    /// panicking action is logged and counts as completed.
    pub async fn drain(&self) {
        if self.draining.swap(true, Ordering::AcqRel) {
            return;
        }

        loop {
            let head = self.lock().front().cloned();
            let Some(action) = head else {
                self.draining.store(false, Ordering::Release);
                // An enqueue may have slipped in between the empty check and the store.
                if self.is_empty() || self.draining.swap(true, Ordering::AcqRel) {
                    return;
                }
                continue;
            };

            settle(action).await;
            self.lock().pop_front();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<HotkeyAction>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Run one action to completion on its own task so a panic cannot take the drain loop down.
async fn settle(action: HotkeyAction) {
    match tokio::spawn(action.run()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "hotkey action failed"),
        Err(e) if e.is_panic() => error!("hotkey action panicked"),
        Err(e) => warn!(error = %e, "hotkey action was cancelled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn recording(
        log: &Arc<Mutex<Vec<String>>>,
        name: &'static str,
        delay_ms: u64,
    ) -> HotkeyAction {
        let log = Arc::clone(log);
        HotkeyAction::new(move || {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{} start", name));
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                log.lock().unwrap().push(format!("{} end", name));
                anyhow::Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_drain_runs_in_order_without_overlap() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let queue = PendingActionQueue::new();
        queue.enqueue(recording(&log, "A", 30));
        queue.enqueue(recording(&log, "B", 5));
        queue.enqueue(recording(&log, "C", 0));

        queue.drain().await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["A start", "A end", "B start", "B end", "C start", "C end"]
        );
        assert!(queue.is_empty());
        assert!(!queue.is_draining());
    }

    #[tokio::test]
    async fn test_entry_removed_only_after_settling() {
        let queue = Arc::new(PendingActionQueue::new());
        let observed = Arc::new(Mutex::new(None));

        let q = Arc::clone(&queue);
        let seen = Arc::clone(&observed);
        queue.enqueue(HotkeyAction::new(move || {
            let q = Arc::clone(&q);
            let seen = Arc::clone(&seen);
            async move {
                *seen.lock().unwrap() = Some(q.len());
                anyhow::Ok(())
            }
        }));

        queue.drain().await;
        assert_eq!(*observed.lock().unwrap(), Some(1));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_failures_do_not_stall_queue() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let queue = PendingActionQueue::new();
        queue.enqueue(HotkeyAction::new(|| async {
            Err::<(), _>(anyhow::anyhow!("handler failed"))
        }));
        queue.enqueue(HotkeyAction::new(|| async {
            if true {
                panic!("handler panicked");
            }
            anyhow::Ok(())
        }));
        queue.enqueue(recording(&log, "after", 0));

        queue.drain().await;

        assert_eq!(*log.lock().unwrap(), vec!["after start", "after end"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_second_drain_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::new(PendingActionQueue::new());
        queue.enqueue(recording(&log, "A", 40));

        let first = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.drain().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(queue.is_draining());

        queue.enqueue(recording(&log, "B", 0));
        // Returns at once; the running drain picks up B.
        queue.drain().await;
        assert_eq!(queue.len(), 2);

        first.await.unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["A start", "A end", "B start", "B end"]
        );
    }
}
