//! The seam to the Remote Partnership Service.
//!
//! The service is the authoritative store for messages and meetings, keyed by
//! partnership id. The core only ever talks to it through [`PartnershipApi`],
//! so tests swap in an in-process implementation.

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::PanelResult;
use crate::models::{Meeting, Message};

pub use http::HttpPartnershipApi;

#[async_trait]
pub trait PartnershipApi: Send + Sync {
    /// Full message list for the partnership, bounded by `limit`.
    async fn list_messages(&self, partnership_id: Uuid, limit: usize)
        -> PanelResult<Vec<Message>>;

    /// Submit a message; the returned record carries the authoritative id.
    async fn send_message(&self, partnership_id: Uuid, text: &str) -> PanelResult<Message>;

    async fn list_meetings(&self, partnership_id: Uuid) -> PanelResult<Vec<Meeting>>;

    async fn create_meeting(
        &self,
        partnership_id: Uuid,
        scheduled_time: DateTime<Utc>,
    ) -> PanelResult<Meeting>;

    /// Accepting a meeting that is no longer pending is not an error at the
    /// remote contract level; implementations map a conflict response to
    /// [`crate::PanelError::MeetingConflict`] so callers can reconcile.
    async fn accept_meeting(&self, partnership_id: Uuid, meeting_id: Uuid)
        -> PanelResult<Meeting>;
}
