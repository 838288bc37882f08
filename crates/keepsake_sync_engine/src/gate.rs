//! Single-fire readiness signal.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// A broadcast that fires once.
///
/// Every waiter, current or future, observes the fire. Firing again is a
/// no-op. Clones share the same signal.
#[derive(Debug, Clone)]
pub struct ReadyGate {
    state: Arc<watch::Sender<bool>>,
}

impl ReadyGate {
    /// Creates an unfired gate.
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Fires the gate. Returns true only for the call that fired it.
    pub fn fire(&self) -> bool {
        self.state.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    /// Returns true once the gate has fired.
    pub fn is_ready(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once the gate has fired.
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        // the sender lives in self, so the channel cannot close here
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Waits up to `timeout` for the gate. Returns true if it fired.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fires_once() {
        let gate = ReadyGate::new();
        assert!(!gate.is_ready());
        assert!(gate.fire());
        assert!(!gate.fire());
        assert!(gate.is_ready());
    }

    #[tokio::test]
    async fn late_waiters_observe_fire() {
        let gate = ReadyGate::new();
        gate.fire();
        gate.wait().await;
        assert!(gate.wait_timeout(Duration::from_millis(1)).await);
    }

    #[tokio::test]
    async fn waiters_wake_on_fire() {
        let gate = ReadyGate::new();
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.wait().await })
            })
            .collect();

        tokio::task::yield_now().await;
        gate.fire();
        for waiter in waiters {
            waiter.await.unwrap();
        }
    }

    #[tokio::test]
    async fn wait_timeout_expires() {
        let gate = ReadyGate::new();
        assert!(!gate.wait_timeout(Duration::from_millis(20)).await);
    }
}
