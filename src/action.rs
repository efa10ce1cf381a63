//! Asynchronous zero-argument actions bound to hotkeys.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The future produced by running a [`HotkeyAction`].
pub type ActionFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

type ActionFn = dyn Fn() -> ActionFuture + Send + Sync;

/// A cloneable handle to an async callback.
///
/// Every call to [`run`](Self::run) produces a fresh future, so the same
/// action can fire any number of times.
#[derive(Clone)]
pub struct HotkeyAction {
    run: Arc<ActionFn>,
    noop: bool,
}

impl HotkeyAction {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            run: Arc::new(move || Box::pin(f()) as ActionFuture),
            noop: false,
        }
    }

    /// Placeholder stored for keys reserved at startup but not yet given behaviour.
    pub fn noop() -> Self {
        Self {
            run: Arc::new(|| Box::pin(async { anyhow::Ok(()) }) as ActionFuture),
            noop: true,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.noop
    }

    pub fn run(&self) -> ActionFuture {
        (self.run)()
    }

    /// Wrap this action so `after` runs once it has settled, whatever the outcome.
    pub fn then<F>(self, after: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let after = Arc::new(after);
        let noop = self.noop;
        let inner = self;
        Self {
            run: Arc::new(move || {
                let fut = inner.run();
                let after = Arc::clone(&after);
                Box::pin(async move {
                    let result = fut.await;
                    after();
                    result
                }) as ActionFuture
            }),
            noop,
        }
    }
}

impl fmt::Debug for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotkeyAction")
            .field("noop", &self.noop)
            .finish_non_exhaustive()
    }
}
