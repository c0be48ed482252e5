//! Process lifecycle: shutdown hooks and termination signals.
//!
//! One [`Lifecycle`] is constructed per process. Backend resources register
//! cleanup futures with [`Lifecycle::on_shutdown`]; every signal path funnels
//! into the idempotent [`Lifecycle::shutdown`], so two signals in quick
//! succession run the hooks once and never panic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

type ShutdownHook = std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>;

pub struct Lifecycle {
    hooks: Mutex<Vec<ShutdownHook>>,
    fired: AtomicBool,
    tx: watch::Sender<bool>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            hooks: Mutex::new(Vec::new()),
            fired: AtomicBool::new(false),
            tx,
        }
    }

    /// Register a cleanup future (close a pool, end a connection). Hooks run
    /// in registration order during shutdown.
    pub async fn on_shutdown(&self, hook: impl std::future::Future<Output = ()> + Send + 'static) {
        self.hooks.lock().await.push(Box::pin(hook));
    }

    /// Run all registered hooks exactly once. Safe to call repeatedly and
    /// from multiple signal paths.
    pub async fn shutdown(&self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        let hooks = {
            let mut guard = self.hooks.lock().await;
            std::mem::take(&mut *guard)
        };
        for hook in hooks {
            hook.await;
        }
        let _ = self.tx.send(true);
        tracing::info!("shutdown complete");
    }

    /// Resolves once shutdown has run. Used by the transport loop to stop
    /// reading frames.
    pub async fn terminated(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Spawn the signal listener. On SIGINT/SIGTERM the hooks run and the
    /// transport loop unblocks; repeated signals are no-ops.
    pub fn install_signal_handlers(lifecycle: &Arc<Self>) {
        let lifecycle = Arc::clone(lifecycle);
        tokio::spawn(async move {
            loop {
                wait_for_signal().await;
                tracing::info!("termination signal received");
                lifecycle.shutdown().await;
            }
        });
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::error!("failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_hooks_run_once_despite_double_shutdown() {
        let lifecycle = Lifecycle::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        lifecycle
            .on_shutdown(async move {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        lifecycle.shutdown().await;
        lifecycle.shutdown().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hooks_run_in_registration_order() {
        let lifecycle = Lifecycle::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            lifecycle
                .on_shutdown(async move {
                    order.lock().await.push(i);
                })
                .await;
        }
        lifecycle.shutdown().await;
        assert_eq!(*order.lock().await, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_terminated_wakes_after_shutdown() {
        let lifecycle = Arc::new(Lifecycle::new());
        let waiter = Arc::clone(&lifecycle);
        let handle = tokio::spawn(async move {
            waiter.terminated().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        lifecycle.shutdown().await;
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("terminated() should resolve")
            .expect("task should not panic");
    }

    #[tokio::test]
    async fn test_terminated_resolves_immediately_when_already_down() {
        let lifecycle = Lifecycle::new();
        lifecycle.shutdown().await;
        tokio::time::timeout(Duration::from_millis(100), lifecycle.terminated())
            .await
            .expect("already terminated");
        assert!(lifecycle.is_terminated());
    }
}
