//! Per-run state passed explicitly into every worker function.

use std::sync::Arc;

use tokio::sync::watch;

use crate::report::RunReport;
use crate::runlog::RunLog;

/// Cooperative cancellation flag, polled between pages and records and
/// awaited during backoff waits.
#[derive(Debug, Clone)]
pub struct CancelFlag(Arc<watch::Sender<bool>>);

impl Default for CancelFlag {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self(Arc::new(tx))
    }
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.0.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Everything a command mutates while it runs.
#[derive(Debug)]
pub struct RunContext {
    pub cancel: CancelFlag,
    pub log: RunLog,
    pub report: RunReport,
}

impl RunContext {
    pub fn new(cancel: CancelFlag, log: RunLog) -> Self {
        Self {
            cancel,
            log,
            report: RunReport::start(),
        }
    }

    /// Context with a tracing-only log, for tests and dry runs.
    #[cfg(test)]
    pub fn detached() -> Self {
        Self::new(CancelFlag::new(), RunLog::tracing_only())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());

        handle.cancel();
        assert!(flag.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let flag = CancelFlag::new();
        let handle = flag.clone();

        let waiter = tokio::spawn(async move { flag.cancelled().await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        handle.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(2), waiter)
            .await
            .expect("waiter should wake on cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_returns_when_already_set() {
        let flag = CancelFlag::new();
        flag.cancel();
        tokio::time::timeout(std::time::Duration::from_millis(100), flag.cancelled())
            .await
            .unwrap();
    }
}
