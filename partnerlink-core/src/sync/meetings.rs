//! Meeting Lifecycle Tracker: polled meeting records for one partnership,
//! monotonic stored status, and per-meeting derived views.
//!
//! The stored status only moves `pending -> accepted`; `ended` is never
//! persisted here, it is derived from the scheduled time at view time.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::PartnershipApi;
use crate::error::{PanelError, PanelResult};
use crate::models::{compute_display_status, countdown_label, Meeting, MeetingStatus};

use super::types::{CollectionStatus, LivenessGate, RefreshOutcome};

/// A meeting as shown to the viewer: stored record plus the derived display
/// status and countdown, classified as organizer vs invitee.
#[derive(Debug, Clone)]
pub struct MeetingView {
    pub meeting: Meeting,
    pub display_status: MeetingStatus,
    /// `None` once the meeting displays as ended.
    pub countdown: Option<String>,
    pub organized_by_viewer: bool,
}

impl MeetingView {
    pub fn derive(meeting: &Meeting, viewer_id: Uuid, now: DateTime<Utc>) -> Self {
        let display_status = compute_display_status(meeting, now);
        let countdown = if display_status == MeetingStatus::Ended {
            None
        } else {
            Some(countdown_label(meeting.scheduled_time, now))
        };
        Self {
            display_status,
            countdown,
            organized_by_viewer: meeting.is_organized_by(viewer_id),
            meeting: meeting.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct MeetingState {
    meetings: Vec<Meeting>,
    status: CollectionStatus,
}

pub struct MeetingTracker {
    partnership_id: Uuid,
    api: Arc<dyn PartnershipApi>,
    gate: LivenessGate,
    state: Arc<RwLock<MeetingState>>,
    in_flight: Mutex<()>,
}

impl MeetingTracker {
    pub fn new(api: Arc<dyn PartnershipApi>, partnership_id: Uuid) -> Self {
        Self::with_gate(api, partnership_id, LivenessGate::new())
    }

    pub fn with_gate(
        api: Arc<dyn PartnershipApi>,
        partnership_id: Uuid,
        gate: LivenessGate,
    ) -> Self {
        Self {
            partnership_id,
            api,
            gate,
            state: Arc::new(RwLock::new(MeetingState::default())),
            in_flight: Mutex::new(()),
        }
    }

    pub fn partnership_id(&self) -> Uuid {
        self.partnership_id
    }

    /// Fetch the meeting list and merge it with the local one. The remote is
    /// authoritative for membership; statuses merge monotonically so a stale
    /// poll never downgrades an accepted meeting back to pending.
    pub async fn refresh(&self) -> PanelResult<RefreshOutcome> {
        if !self.gate.is_open() {
            return Ok(RefreshOutcome::SkippedClosed);
        }
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(partnership_id = %self.partnership_id, "meeting refresh already in flight, skipping");
                return Ok(RefreshOutcome::SkippedInFlight);
            }
        };

        {
            let mut state = self.state.write().await;
            state.status.refreshing = true;
        }

        let fetched = self.api.list_meetings(self.partnership_id).await;

        if !self.gate.is_open() {
            debug!(partnership_id = %self.partnership_id, "panel closed mid-refresh, discarding meeting result");
            self.state.write().await.status.refreshing = false;
            return Ok(RefreshOutcome::SkippedClosed);
        }

        let mut state = self.state.write().await;
        state.status.refreshing = false;

        match fetched {
            Ok(meetings) => {
                let merged = merge_meetings(&state.meetings, meetings);
                let count = merged.len();
                state.meetings = merged;
                state.status.record_success(Utc::now());
                debug!(partnership_id = %self.partnership_id, count, "meeting refresh applied");
                Ok(RefreshOutcome::Applied { fetched: count })
            }
            Err(e) => {
                warn!(partnership_id = %self.partnership_id, "meeting refresh failed, stale list retained: {}", e);
                state.status.record_failure(&e.to_string(), Utc::now());
                Err(e)
            }
        }
    }

    /// Propose a meeting. Times not in the future are rejected locally
    /// before any network call.
    pub async fn propose(&self, scheduled_time: DateTime<Utc>) -> PanelResult<Meeting> {
        if scheduled_time <= Utc::now() {
            return Err(PanelError::MeetingInPast(scheduled_time));
        }
        if !self.gate.is_open() {
            return Err(PanelError::PanelClosed);
        }

        let result = self
            .api
            .create_meeting(self.partnership_id, scheduled_time)
            .await;

        if !self.gate.is_open() {
            return Err(PanelError::PanelClosed);
        }

        match result {
            Ok(meeting) => {
                let mut state = self.state.write().await;
                upsert(&mut state.meetings, meeting.clone());
                info!(partnership_id = %self.partnership_id, meeting_id = %meeting.id, "meeting proposed");
                Ok(meeting)
            }
            Err(e) => {
                error!(partnership_id = %self.partnership_id, "meeting proposal failed: {}", e);
                Err(e)
            }
        }
    }

    /// Accept a pending meeting.
    ///
    /// Accepting a meeting that is no longer pending is a local no-op that
    /// returns the stored record. A remote conflict (the accept raced another
    /// device) is reconciled by refreshing instead of alarming the user.
    pub async fn accept(&self, meeting_id: Uuid) -> PanelResult<Meeting> {
        if !self.gate.is_open() {
            return Err(PanelError::PanelClosed);
        }

        {
            let state = self.state.read().await;
            let stored = state
                .meetings
                .iter()
                .find(|m| m.id == meeting_id)
                .ok_or(PanelError::MeetingNotFound(meeting_id))?;
            if stored.status != MeetingStatus::Pending {
                debug!(%meeting_id, status = %stored.status, "accept is a no-op, meeting no longer pending");
                return Ok(stored.clone());
            }
        }

        let result = self.api.accept_meeting(self.partnership_id, meeting_id).await;

        if !self.gate.is_open() {
            return Err(PanelError::PanelClosed);
        }

        match result {
            Ok(meeting) => {
                let mut state = self.state.write().await;
                upsert(&mut state.meetings, meeting.clone());
                info!(partnership_id = %self.partnership_id, %meeting_id, "meeting accepted");
                Ok(meeting)
            }
            Err(PanelError::MeetingConflict(detail)) => {
                debug!(%meeting_id, "accept conflicted remotely, reconciling: {}", detail);
                let _ = self.refresh().await;
                let state = self.state.read().await;
                state
                    .meetings
                    .iter()
                    .find(|m| m.id == meeting_id)
                    .cloned()
                    .ok_or(PanelError::MeetingNotFound(meeting_id))
            }
            Err(e) => {
                error!(partnership_id = %self.partnership_id, %meeting_id, "meeting accept failed: {}", e);
                Err(e)
            }
        }
    }

    pub async fn meetings(&self) -> Vec<Meeting> {
        self.state.read().await.meetings.clone()
    }

    /// Derived views at the given instant, ordered by scheduled time.
    pub async fn views(&self, viewer_id: Uuid, now: DateTime<Utc>) -> Vec<MeetingView> {
        self.state
            .read()
            .await
            .meetings
            .iter()
            .map(|m| MeetingView::derive(m, viewer_id, now))
            .collect()
    }

    pub async fn status(&self) -> CollectionStatus {
        self.state.read().await.status.clone()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.meetings.is_empty()
    }
}

/// Remote membership wins; statuses merge monotonically per meeting.
fn merge_meetings(current: &[Meeting], fetched: Vec<Meeting>) -> Vec<Meeting> {
    let known: HashMap<Uuid, &Meeting> = current.iter().map(|m| (m.id, m)).collect();

    let mut merged: Vec<Meeting> = Vec::with_capacity(fetched.len());
    let mut seen = HashSet::new();
    for remote in fetched {
        if !seen.insert(remote.id) {
            continue;
        }
        let meeting = match known.get(&remote.id) {
            Some(local) => {
                let mut local = (*local).clone();
                local.merge_remote(remote);
                local
            }
            None => remote,
        };
        merged.push(meeting);
    }

    merged.sort_by_key(|m| (m.scheduled_time, m.id));
    merged
}

/// Insert or monotonically update one meeting, keeping scheduled-time order.
fn upsert(meetings: &mut Vec<Meeting>, meeting: Meeting) {
    match meetings.iter_mut().find(|m| m.id == meeting.id) {
        Some(existing) => existing.merge_remote(meeting),
        None => meetings.push(meeting),
    }
    meetings.sort_by_key(|m| (m.scheduled_time, m.id));
}
