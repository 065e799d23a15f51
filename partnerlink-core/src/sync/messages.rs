//! Message Synchronizer: one deduped, time-ordered thread per partnership.
//!
//! Polled refreshes replace the confirmed entries; optimistic sends live as
//! `PendingSend` entries until the remote acknowledges them, at which point
//! the two copies collapse into one confirmed entry keyed by the
//! authoritative id.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::PartnershipApi;
use crate::error::{PanelError, PanelResult};
use crate::models::{Message, ThreadEntry};

use super::types::{CollectionStatus, LivenessGate, RefreshOutcome};

/// A thread entry classified against the viewer identity.
#[derive(Debug, Clone)]
pub struct MessageView {
    pub entry: ThreadEntry,
    /// True for the viewer's own messages; pending sends are always own.
    pub own: bool,
}

#[derive(Debug, Default)]
struct ThreadState {
    entries: Vec<ThreadEntry>,
    status: CollectionStatus,
}

pub struct MessageSynchronizer {
    partnership_id: Uuid,
    api: Arc<dyn PartnershipApi>,
    page_size: usize,
    gate: LivenessGate,
    state: Arc<RwLock<ThreadState>>,
    in_flight: Mutex<()>,
}

impl MessageSynchronizer {
    pub fn new(api: Arc<dyn PartnershipApi>, partnership_id: Uuid, page_size: usize) -> Self {
        Self::with_gate(api, partnership_id, page_size, LivenessGate::new())
    }

    pub fn with_gate(
        api: Arc<dyn PartnershipApi>,
        partnership_id: Uuid,
        page_size: usize,
        gate: LivenessGate,
    ) -> Self {
        Self {
            partnership_id,
            api,
            page_size,
            gate,
            state: Arc::new(RwLock::new(ThreadState::default())),
            in_flight: Mutex::new(()),
        }
    }

    pub fn partnership_id(&self) -> Uuid {
        self.partnership_id
    }

    /// Fetch the message list and reconcile it with the confirmed entries.
    ///
    /// A page that comes back below `page_size` provably covers the whole
    /// thread, so it replaces the confirmed entries and remote deletions take
    /// effect. An exactly-full page gives no such confirmation, so confirmed
    /// messages older than the window are retained and merged by `id`.
    ///
    /// Idempotent. At most one refresh per collection is in flight: a trigger
    /// that finds one running is dropped, which also keeps results applied in
    /// request order. On fetch failure the previous list is retained and the
    /// failure recorded in the collection status.
    pub async fn refresh(&self) -> PanelResult<RefreshOutcome> {
        if !self.gate.is_open() {
            return Ok(RefreshOutcome::SkippedClosed);
        }
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(partnership_id = %self.partnership_id, "message refresh already in flight, skipping");
                return Ok(RefreshOutcome::SkippedInFlight);
            }
        };

        {
            let mut state = self.state.write().await;
            state.status.refreshing = true;
        }

        let fetched = self
            .api
            .list_messages(self.partnership_id, self.page_size)
            .await;

        if !self.gate.is_open() {
            debug!(partnership_id = %self.partnership_id, "panel closed mid-refresh, discarding message result");
            self.state.write().await.status.refreshing = false;
            return Ok(RefreshOutcome::SkippedClosed);
        }

        let mut state = self.state.write().await;
        state.status.refreshing = false;

        match fetched {
            Ok(messages) => {
                let window_covers_thread = messages.len() < self.page_size;
                let mut confirmed = reconcile(messages);
                let count = confirmed.len();

                if !window_covers_thread {
                    let fetched_ids: HashSet<Uuid> =
                        confirmed.iter().map(|m| m.id).collect();
                    confirmed.extend(
                        state
                            .entries
                            .iter()
                            .filter_map(|e| e.confirmed())
                            .filter(|m| !fetched_ids.contains(&m.id))
                            .cloned(),
                    );
                }

                let mut entries: Vec<ThreadEntry> =
                    confirmed.into_iter().map(ThreadEntry::Confirmed).collect();
                entries.extend(state.entries.iter().filter(|e| e.is_pending()).cloned());
                entries.sort_by_key(|e| e.sort_key());

                state.entries = entries;
                state.status.record_success(Utc::now());
                debug!(partnership_id = %self.partnership_id, count, "message refresh applied");
                Ok(RefreshOutcome::Applied { fetched: count })
            }
            Err(e) => {
                warn!(partnership_id = %self.partnership_id, "message refresh failed, stale list retained: {}", e);
                state.status.record_failure(&e.to_string(), Utc::now());
                Err(e)
            }
        }
    }

    /// Optimistic send.
    ///
    /// Whitespace-only text is rejected locally with no network call. On
    /// success the pending entry collapses into the authoritative record
    /// returned by the remote; on failure the list reverts to exactly its
    /// prior contents and the error carries the original text for retry.
    /// No automatic retry.
    pub async fn send(&self, text: &str) -> PanelResult<Message> {
        if text.trim().is_empty() {
            return Err(PanelError::EmptyMessage);
        }
        if !self.gate.is_open() {
            return Err(PanelError::PanelClosed);
        }

        let local_id = Uuid::new_v4();
        {
            let mut state = self.state.write().await;
            state.entries.push(ThreadEntry::PendingSend {
                local_id,
                text: text.to_string(),
                created_at: Utc::now(),
            });
        }

        let result = self.api.send_message(self.partnership_id, text).await;

        if !self.gate.is_open() {
            // The send may or may not have reached the server; the next
            // session's poll reconciles either way.
            return Err(PanelError::PanelClosed);
        }

        let mut state = self.state.write().await;
        state.entries.retain(
            |e| !matches!(e, ThreadEntry::PendingSend { local_id: id, .. } if *id == local_id),
        );

        match result {
            Ok(message) => {
                let already_known = state
                    .entries
                    .iter()
                    .filter_map(|e| e.confirmed())
                    .any(|m| m.id == message.id);
                if !already_known {
                    state.entries.push(ThreadEntry::Confirmed(message.clone()));
                    state.entries.sort_by_key(|e| e.sort_key());
                }
                info!(partnership_id = %self.partnership_id, message_id = %message.id, "message sent");
                Ok(message)
            }
            Err(e) => {
                error!(partnership_id = %self.partnership_id, "message send failed: {}", e);
                // Inline error flag for the shell; cleared by the next
                // successful refresh.
                state.status.record_failure(&e.to_string(), Utc::now());
                Err(PanelError::SendFailed {
                    text: text.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Drop optimistic entries left behind when a close interrupted an
    /// in-flight send. The next poll carries the confirmed copy if the
    /// server committed that send; keeping the orphan would render the same
    /// text twice.
    pub async fn drop_pending_sends(&self) {
        let mut state = self.state.write().await;
        state.entries.retain(|e| !e.is_pending());
    }

    /// Current thread, ordered ascending by creation time.
    pub async fn entries(&self) -> Vec<ThreadEntry> {
        self.state.read().await.entries.clone()
    }

    /// Current thread classified against the viewer identity.
    pub async fn views(&self, viewer_id: Uuid) -> Vec<MessageView> {
        self.state
            .read()
            .await
            .entries
            .iter()
            .map(|entry| MessageView {
                own: entry.confirmed().map_or(true, |m| m.is_own(viewer_id)),
                entry: entry.clone(),
            })
            .collect()
    }

    pub async fn status(&self) -> CollectionStatus {
        self.state.read().await.status.clone()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

/// Normalize one fetched page: drop blank records the backend should never
/// emit, dedupe by id, order ascending by `(created_at, id)`.
pub(crate) fn reconcile(mut fetched: Vec<Message>) -> Vec<Message> {
    fetched.retain(|m| !m.text.trim().is_empty());
    fetched.sort_by_key(|m| (m.created_at, m.id));
    let mut seen = HashSet::new();
    fetched.retain(|m| seen.insert(m.id));
    fetched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartnerRole;
    use chrono::{DateTime, Duration, Utc};

    fn message(id: Uuid, text: &str, created_at: DateTime<Utc>) -> Message {
        Message {
            id,
            text: text.to_string(),
            created_at,
            sender_id: Uuid::new_v4(),
            sender_name: "Dana".to_string(),
            sender_role: PartnerRole::Ngo,
        }
    }

    #[test]
    fn test_reconcile_dedupes_by_id() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let fetched = vec![
            message(id, "first copy", now),
            message(Uuid::new_v4(), "other", now + Duration::seconds(1)),
            message(id, "first copy", now),
        ];

        let merged = reconcile(fetched);
        assert_eq!(merged.len(), 2);
        let ids: HashSet<Uuid> = merged.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_reconcile_orders_by_created_at() {
        let now = Utc::now();
        let fetched = vec![
            message(Uuid::new_v4(), "late", now + Duration::minutes(2)),
            message(Uuid::new_v4(), "early", now),
            message(Uuid::new_v4(), "middle", now + Duration::minutes(1)),
        ];

        let merged = reconcile(fetched);
        assert_eq!(merged[0].text, "early");
        assert_eq!(merged[1].text, "middle");
        assert_eq!(merged[2].text, "late");
    }

    #[test]
    fn test_reconcile_drops_blank_text() {
        let now = Utc::now();
        let fetched = vec![
            message(Uuid::new_v4(), "   ", now),
            message(Uuid::new_v4(), "kept", now),
        ];

        let merged = reconcile(fetched);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "kept");
    }

    #[test]
    fn test_reconcile_tie_breaks_on_id() {
        let now = Utc::now();
        let fetched = vec![
            message(Uuid::new_v4(), "a", now),
            message(Uuid::new_v4(), "b", now),
        ];

        let once = reconcile(fetched.clone());
        let mut reversed = fetched;
        reversed.reverse();
        let twice = reconcile(reversed);

        let once_ids: Vec<Uuid> = once.iter().map(|m| m.id).collect();
        let twice_ids: Vec<Uuid> = twice.iter().map(|m| m.id).collect();
        assert_eq!(once_ids, twice_ids);
    }
}
