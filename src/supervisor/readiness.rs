//! Shared backend readiness flag.

use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Notify;

/// Backend lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessState {
    /// Not yet answering.
    Starting,
    /// Serving requests.
    Ready,
    /// Stopped answering or failed to start.
    Failed,
}

impl ReadinessState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Ready,
            2 => Self::Failed,
            _ => Self::Starting,
        }
    }

    const fn as_u8(self) -> u8 {
        match self {
            Self::Starting => 0,
            Self::Ready => 1,
            Self::Failed => 2,
        }
    }
}

impl std::fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: AtomicU8,
    changed: Notify,
    last_error: RwLock<Option<String>>,
}

/// Cloneable readiness handle. Written by the supervisor, read by request
/// handlers.
#[derive(Debug, Clone, Default)]
pub struct Readiness {
    inner: Arc<Inner>,
}

impl Readiness {
    /// New handle in the `starting` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> ReadinessState {
        ReadinessState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Whether requests may be served.
    pub fn is_ready(&self) -> bool {
        self.state() == ReadinessState::Ready
    }

    /// Mark ready and wake waiters.
    pub fn set_ready(&self) {
        *self
            .inner
            .last_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.set(ReadinessState::Ready);
    }

    /// Mark failed, recording why.
    pub fn set_failed(&self, reason: impl Into<String>) {
        *self
            .inner
            .last_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
        self.set(ReadinessState::Failed);
    }

    fn set(&self, state: ReadinessState) {
        let previous = self.inner.state.swap(state.as_u8(), Ordering::AcqRel);
        if previous != state.as_u8() {
            self.inner.changed.notify_waiters();
        }
    }

    /// Reason for the last failure, if the backend is not ready.
    pub fn last_error(&self) -> Option<String> {
        self.inner
            .last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait up to `timeout` for the ready state. Returns immediately when
    /// already ready.
    pub async fn wait_ready(&self, timeout: Duration) -> bool {
        if self.is_ready() {
            return true;
        }
        if timeout.is_zero() {
            return false;
        }

        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.inner.changed.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.is_ready() {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_in_starting_state() {
        let readiness = Readiness::new();
        assert_eq!(readiness.state(), ReadinessState::Starting);
        assert!(!readiness.is_ready());
        assert!(readiness.last_error().is_none());
    }

    #[test]
    fn test_transitions() {
        let readiness = Readiness::new();
        readiness.set_failed("connection refused");
        assert_eq!(readiness.state(), ReadinessState::Failed);
        assert_eq!(readiness.last_error().as_deref(), Some("connection refused"));

        readiness.set_ready();
        assert!(readiness.is_ready());
        assert!(readiness.last_error().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let readiness = Readiness::new();
        let reader = readiness.clone();
        readiness.set_ready();
        assert!(reader.is_ready());
    }

    #[tokio::test]
    async fn test_wait_ready_times_out() {
        let readiness = Readiness::new();
        assert!(!readiness.wait_ready(Duration::ZERO).await);
        assert!(!readiness.wait_ready(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn test_wait_ready_wakes_on_transition() {
        let readiness = Readiness::new();
        let writer = readiness.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.set_ready();
        });
        assert!(readiness.wait_ready(Duration::from_secs(5)).await);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&ReadinessState::Starting).unwrap_or_default();
        assert_eq!(json, "\"starting\"");
    }
}
