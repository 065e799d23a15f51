//! Polling Orchestrator: keeps the message synchronizer and meeting tracker
//! fresh while the panel is open, and stops everything on close.
//!
//! One spawned loop drives three tickers: message refresh, meeting refresh,
//! and a one-second countdown tick that recomputes the cached meeting views.
//! Write actions trigger an immediate out-of-band refresh of the affected
//! collection so the user sees authoritative data without waiting for the
//! next periodic tick.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::PartnershipApi;
use crate::config::PanelConfig;
use crate::error::{PanelError, PanelResult};
use crate::models::{Meeting, Message};

use super::meetings::{MeetingTracker, MeetingView};
use super::messages::{MessageSynchronizer, MessageView};
use super::types::{CollectionStatus, LivenessGate};

pub struct PartnershipPanel {
    partnership_id: Uuid,
    viewer_id: Uuid,
    config: PanelConfig,
    messages: Arc<MessageSynchronizer>,
    meetings: Arc<MeetingTracker>,
    gate: LivenessGate,
    meeting_views: Arc<RwLock<Vec<MeetingView>>>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl PartnershipPanel {
    pub fn new(
        api: Arc<dyn PartnershipApi>,
        partnership_id: Uuid,
        viewer_id: Uuid,
        config: PanelConfig,
    ) -> Self {
        // Closed until open(): nothing polls and nothing mutates before the
        // panel enters its open observation state.
        let gate = LivenessGate::closed();
        let messages = Arc::new(MessageSynchronizer::with_gate(
            api.clone(),
            partnership_id,
            config.messages.page_size,
            gate.clone(),
        ));
        let meetings = Arc::new(MeetingTracker::with_gate(
            api,
            partnership_id,
            gate.clone(),
        ));

        Self {
            partnership_id,
            viewer_id,
            config,
            messages,
            meetings,
            gate,
            meeting_views: Arc::new(RwLock::new(Vec::new())),
            shutdown_tx: Mutex::new(None),
        }
    }

    pub fn partnership_id(&self) -> Uuid {
        self.partnership_id
    }

    pub fn viewer_id(&self) -> Uuid {
        self.viewer_id
    }

    pub fn is_open(&self) -> bool {
        self.gate.is_open()
    }

    /// Enter the open observation state and start both poll loops plus the
    /// countdown tick. The first ticks fire immediately, so both collections
    /// refresh right away.
    pub async fn open(&self) -> PanelResult<()> {
        if self.gate.is_open() {
            return Err(PanelError::PanelAlreadyOpen);
        }
        // A close can interrupt a send after the server committed it; the
        // orphaned optimistic entry would duplicate the confirmed copy the
        // first poll brings in.
        self.messages.drop_pending_sends().await;
        self.gate.open();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *self.shutdown_tx.lock().await = Some(shutdown_tx);

        let messages = self.messages.clone();
        let meetings = self.meetings.clone();
        let gate = self.gate.clone();
        let meeting_views = self.meeting_views.clone();
        let viewer_id = self.viewer_id;
        let polling = self.config.polling.clone();

        tokio::spawn(async move {
            poll_loop(
                messages,
                meetings,
                gate,
                meeting_views,
                viewer_id,
                polling.message_interval_secs,
                polling.meeting_interval_secs,
                polling.countdown_tick_ms,
                shutdown_rx,
            )
            .await;
        });

        info!(
            partnership_id = %self.partnership_id,
            message_interval_secs = self.config.polling.message_interval_secs,
            meeting_interval_secs = self.config.polling.meeting_interval_secs,
            "panel opened"
        );
        Ok(())
    }

    /// Leave the open state: release all timers and make late network
    /// responses inert. Safe to call more than once and regardless of why the
    /// panel is going away (explicit close, navigation, error).
    pub async fn close(&self) {
        self.gate.close();
        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }
        info!(partnership_id = %self.partnership_id, "panel closed");
    }

    /// Send a message, then refresh the thread immediately so the confirmed
    /// entry renders with its authoritative id. A failed post-send refresh is
    /// the silent kind; the send result stands on its own.
    pub async fn send_message(&self, text: &str) -> PanelResult<Message> {
        let message = self.messages.send(text).await?;
        if let Err(e) = self.messages.refresh().await {
            debug!("post-send message refresh failed: {}", e);
        }
        Ok(message)
    }

    /// Propose a meeting, then refresh the meeting list immediately.
    pub async fn propose_meeting(&self, scheduled_time: chrono::DateTime<Utc>) -> PanelResult<Meeting> {
        let meeting = self.meetings.propose(scheduled_time).await?;
        if let Err(e) = self.meetings.refresh().await {
            debug!("post-propose meeting refresh failed: {}", e);
        }
        self.recompute_meeting_views().await;
        Ok(meeting)
    }

    /// Accept a pending meeting, then refresh the meeting list immediately.
    pub async fn accept_meeting(&self, meeting_id: Uuid) -> PanelResult<Meeting> {
        let meeting = self.meetings.accept(meeting_id).await?;
        if let Err(e) = self.meetings.refresh().await {
            debug!("post-accept meeting refresh failed: {}", e);
        }
        self.recompute_meeting_views().await;
        Ok(meeting)
    }

    /// Ordered thread, classified own vs partner for the viewer.
    pub async fn message_views(&self) -> Vec<MessageView> {
        self.messages.views(self.viewer_id).await
    }

    /// Meeting views as of the last countdown tick.
    pub async fn meeting_views(&self) -> Vec<MeetingView> {
        self.meeting_views.read().await.clone()
    }

    pub async fn message_status(&self) -> CollectionStatus {
        self.messages.status().await
    }

    pub async fn meeting_status(&self) -> CollectionStatus {
        self.meetings.status().await
    }

    /// True when the partnership has neither messages nor meetings yet; the
    /// shell renders its empty-state copy off this.
    pub async fn is_empty(&self) -> bool {
        self.messages.is_empty().await && self.meetings.is_empty().await
    }

    async fn recompute_meeting_views(&self) {
        if !self.gate.is_open() {
            return;
        }
        let views = self.meetings.views(self.viewer_id, Utc::now()).await;
        *self.meeting_views.write().await = views;
    }
}

#[allow(clippy::too_many_arguments)]
async fn poll_loop(
    messages: Arc<MessageSynchronizer>,
    meetings: Arc<MeetingTracker>,
    gate: LivenessGate,
    meeting_views: Arc<RwLock<Vec<MeetingView>>>,
    viewer_id: Uuid,
    message_interval_secs: u64,
    meeting_interval_secs: u64,
    countdown_tick_ms: u64,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut message_tick = interval(Duration::from_secs(message_interval_secs));
    let mut meeting_tick = interval(Duration::from_secs(meeting_interval_secs));
    let mut countdown_tick = interval(Duration::from_millis(countdown_tick_ms));
    // A tick that fires while its refresh is still running must be dropped,
    // not replayed in a burst afterwards.
    message_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    meeting_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    countdown_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = message_tick.tick() => {
                if !gate.is_open() {
                    break;
                }
                if let Err(e) = messages.refresh().await {
                    warn!("scheduled message refresh failed: {}", e);
                }
            }
            _ = meeting_tick.tick() => {
                if !gate.is_open() {
                    break;
                }
                if let Err(e) = meetings.refresh().await {
                    warn!("scheduled meeting refresh failed: {}", e);
                }
            }
            _ = countdown_tick.tick() => {
                if !gate.is_open() {
                    break;
                }
                let views = meetings.views(viewer_id, Utc::now()).await;
                if gate.is_open() {
                    *meeting_views.write().await = views;
                }
            }
            _ = &mut shutdown_rx => {
                debug!("panel poll loop shutting down");
                break;
            }
        }
    }
}
