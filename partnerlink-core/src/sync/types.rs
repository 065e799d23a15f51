use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-collection health, exposed to the presentation shell as its
/// error/loading flag. A failed periodic refresh lands here instead of
/// blocking the view: the stale list stays on screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStatus {
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_success: bool,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    /// A refresh for this collection is currently in flight.
    pub refreshing: bool,
}

impl Default for CollectionStatus {
    fn default() -> Self {
        Self {
            last_refresh: None,
            last_success: true,
            consecutive_failures: 0,
            last_error: None,
            refreshing: false,
        }
    }
}

impl CollectionStatus {
    pub fn record_success(&mut self, at: DateTime<Utc>) {
        self.last_refresh = Some(at);
        self.last_success = true;
        self.consecutive_failures = 0;
        self.last_error = None;
    }

    pub fn record_failure(&mut self, error: &str, at: DateTime<Utc>) {
        self.last_refresh = Some(at);
        self.last_success = false;
        self.consecutive_failures += 1;
        self.last_error = Some(error.to_string());
    }

    pub fn is_degraded(&self) -> bool {
        !self.last_success
    }
}

/// What a refresh call actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Fetched and applied; `fetched` counts confirmed records after merge.
    Applied { fetched: usize },
    /// A refresh for this collection was already in flight; this trigger was
    /// dropped, not queued.
    SkippedInFlight,
    /// The panel closed before or while the request ran; the result was
    /// discarded without touching state.
    SkippedClosed,
}

/// Shared liveness flag for one panel instance.
///
/// Every state application re-checks the gate after its await point, so a
/// network response arriving after `close()` can never mutate panel state.
#[derive(Debug, Clone)]
pub struct LivenessGate {
    open: Arc<AtomicBool>,
}

impl LivenessGate {
    /// A gate that starts open, for components used outside a panel.
    pub fn new() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// A gate that starts closed; the panel opens it in `open()`.
    pub fn closed() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::Release);
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl Default for LivenessGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_status_default() {
        let status = CollectionStatus::default();
        assert!(status.last_success);
        assert!(!status.is_degraded());
        assert_eq!(status.consecutive_failures, 0);
        assert!(status.last_error.is_none());
    }

    #[test]
    fn test_record_failure_then_success() {
        let mut status = CollectionStatus::default();

        status.record_failure("timeout", Utc::now());
        status.record_failure("timeout", Utc::now());
        assert!(status.is_degraded());
        assert_eq!(status.consecutive_failures, 2);
        assert_eq!(status.last_error.as_deref(), Some("timeout"));

        status.record_success(Utc::now());
        assert!(!status.is_degraded());
        assert_eq!(status.consecutive_failures, 0);
        assert!(status.last_error.is_none());
    }

    #[test]
    fn test_liveness_gate_transitions() {
        let gate = LivenessGate::new();
        assert!(gate.is_open());

        let clone = gate.clone();
        gate.close();
        assert!(!clone.is_open());

        clone.open();
        assert!(gate.is_open());

        assert!(!LivenessGate::closed().is_open());
    }
}
