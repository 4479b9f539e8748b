//! Shutdown coordination for graceful server shutdown.
//!
//! This module provides shared shutdown state for coordinating graceful
//! shutdown between the application shell, the accept loop, the turn tick
//! and every live session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Shared shutdown state for coordinating graceful shutdown across components.
#[derive(Debug, Clone)]
pub struct ShutdownState {
    /// Set once shutdown has been initiated; tasks stop taking new work
    shutdown_initiated: Arc<watch::Sender<bool>>,
    /// Set once every session has been closed and final cleanup can begin
    shutdown_complete: Arc<AtomicBool>,
}

impl ShutdownState {
    /// Creates a new shutdown state with both flags cleared.
    pub fn new() -> Self {
        let (shutdown_initiated, _) = watch::channel(false);
        Self {
            shutdown_initiated: Arc::new(shutdown_initiated),
            shutdown_complete: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        *self.shutdown_initiated.borrow()
    }

    /// Returns true if shutdown is complete and final cleanup can begin.
    pub fn is_shutdown_complete(&self) -> bool {
        self.shutdown_complete.load(Ordering::Acquire)
    }

    /// Initiates shutdown and wakes every task waiting in [`wait`](Self::wait).
    pub fn initiate_shutdown(&self) {
        if !self.shutdown_initiated.send_replace(true) {
            info!("🛑 Shutdown initiated - no new connections will be accepted");
        }
    }

    /// Marks shutdown as complete - all sessions have been released.
    pub fn complete_shutdown(&self) {
        self.shutdown_complete.store(true, Ordering::Release);
        info!("✅ All sessions closed - ready for final cleanup");
    }

    /// Resolves once shutdown has been initiated. Returns immediately if it
    /// already was.
    pub async fn wait(&self) {
        let mut receiver = self.shutdown_initiated.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = receiver.wait_for(|initiated| *initiated).await;
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn waiters_wake_on_initiate() {
        let state = ShutdownState::new();
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.wait().await })
        };
        assert!(!state.is_shutdown_initiated());

        state.initiate_shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter did not wake")
            .unwrap();
        assert!(state.is_shutdown_initiated());
        assert!(!state.is_shutdown_complete());
    }

    #[tokio::test]
    async fn wait_after_initiate_returns_immediately() {
        let state = ShutdownState::new();
        state.initiate_shutdown();
        state.initiate_shutdown();
        tokio::time::timeout(Duration::from_millis(100), state.wait())
            .await
            .expect("wait blocked after shutdown");
        state.complete_shutdown();
        assert!(state.is_shutdown_complete());
    }
}
