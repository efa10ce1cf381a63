//! Routing of hotkey notifications to their registered actions.

use std::sync::{Arc, RwLock};
use tracing::{debug, trace, warn};

use crate::action::HotkeyAction;
use crate::error::Result;
use crate::hotkey::HotkeyDescriptor;
use crate::queue::PendingActionQueue;
use crate::registry::HotkeyRegistry;

/// What happened to a notification line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The action was started immediately.
    Instant,
    /// The action was appended to the pending queue.
    Queued,
    /// No action is registered for the key; the notification was dropped.
    Unregistered,
}

/// Owns the hotkey registry and the pending action queue.
#[derive(Debug, Default)]
pub struct HotkeyDispatcher {
    registry: RwLock<HotkeyRegistry>,
    queue: Arc<PendingActionQueue>,
}

impl HotkeyDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queue(&self) -> &Arc<PendingActionQueue> {
        &self.queue
    }

    /// Reserve placeholder entries for the startup hotkeys.
    pub fn register_bulk(&self, descriptors: &[HotkeyDescriptor]) -> Result<Vec<String>> {
        self.write_registry().register_bulk(descriptors)
    }

    /// Bind an action to a canonical key.
    ///
    /// Queued actions restart the drain loop once they complete, so anything
    /// that arrived while they ran is picked up.
    pub fn register(&self, key: impl Into<String>, action: HotkeyAction, instant: bool) -> Result<()> {
        let action = if instant {
            action
        } else {
            let queue = Arc::clone(&self.queue);
            action.then(move || spawn_drain(&queue))
        };
        self.write_registry().insert(key, action, instant)
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.read_registry().contains(key)
    }

    /// Route one notification line from the hotkeys process.
    pub fn dispatch(&self, line: &str) -> Dispatch {
        let key = line.trim_end_matches(['\r', '\n']);
        let entry = self.read_registry().get(key).cloned();

        let Some(entry) = entry else {
            debug!(key = %key, "no action registered for hotkey");
            return Dispatch::Unregistered;
        };

        if entry.instant {
            trace!(key = %key, "running instant hotkey action");
            let key = key.to_string();
            let fut = entry.action.run();
            tokio::spawn(async move {
                if let Err(e) = fut.await {
                    warn!(key = %key, error = %e, "instant hotkey action failed");
                }
            });
            Dispatch::Instant
        } else {
            self.queue.enqueue(entry.action);
            spawn_drain(&self.queue);
            Dispatch::Queued
        }
    }

    fn read_registry(&self) -> std::sync::RwLockReadGuard<'_, HotkeyRegistry> {
        self.registry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_registry(&self) -> std::sync::RwLockWriteGuard<'_, HotkeyRegistry> {
        self.registry
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn spawn_drain(queue: &Arc<PendingActionQueue>) {
    let queue = Arc::clone(queue);
    tokio::spawn(async move { queue.drain().await });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn reporting(tx: &mpsc::UnboundedSender<&'static str>, name: &'static str) -> HotkeyAction {
        let tx = tx.clone();
        HotkeyAction::new(move || {
            let tx = tx.clone();
            async move {
                tx.send(name)?;
                anyhow::Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_unregistered_key_is_dropped() {
        let dispatcher = HotkeyDispatcher::new();
        assert_eq!(dispatcher.dispatch("F9"), Dispatch::Unregistered);
        assert!(dispatcher.queue().is_empty());
    }

    #[tokio::test]
    async fn test_instant_action_runs_immediately() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = HotkeyDispatcher::new();
        dispatcher.register("F1", reporting(&tx, "F1"), true).unwrap();

        assert_eq!(dispatcher.dispatch("F1\r\n"), Dispatch::Instant);
        assert_eq!(rx.recv().await, Some("F1"));
        assert!(dispatcher.queue().is_empty());
    }

    #[tokio::test]
    async fn test_queued_actions_keep_arrival_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = HotkeyDispatcher::new();

        for (key, delay) in [("a", 30u64), ("b", 10), ("c", 0)] {
            let order = Arc::clone(&order);
            let action = HotkeyAction::new(move || {
                let order = Arc::clone(&order);
                async move {
                    order.lock().unwrap().push(format!("{} start", key));
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    order.lock().unwrap().push(format!("{} end", key));
                    anyhow::Ok(())
                }
            });
            dispatcher.register(key, action, false).unwrap();
        }

        assert_eq!(dispatcher.dispatch("a"), Dispatch::Queued);
        assert_eq!(dispatcher.dispatch("b"), Dispatch::Queued);
        assert_eq!(dispatcher.dispatch("c"), Dispatch::Queued);

        for _ in 0..100 {
            if order.lock().unwrap().len() == 6 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(
            *order.lock().unwrap(),
            vec!["a start", "a end", "b start", "b end", "c start", "c end"]
        );
    }

    #[tokio::test]
    async fn test_placeholder_keys_are_registered() {
        let dispatcher = HotkeyDispatcher::new();
        dispatcher
            .register_bulk(&[HotkeyDescriptor::combination(["a", "b"])])
            .unwrap();
        assert!(dispatcher.is_registered("a b"));
        assert_eq!(dispatcher.dispatch("a b"), Dispatch::Queued);
    }
}
