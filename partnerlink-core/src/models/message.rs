use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of the partnership a sender belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerRole {
    Corporate,
    Ngo,
}

impl std::fmt::Display for PartnerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartnerRole::Corporate => write!(f, "corporate"),
            PartnerRole::Ngo => write!(f, "ngo"),
        }
    }
}

/// A confirmed thread message as stored by the remote partnership service.
///
/// `id` is server-issued and stable across polls; within one partnership no
/// two messages share an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_role: PartnerRole,
}

impl Message {
    pub fn is_own(&self, viewer_id: Uuid) -> bool {
        self.sender_id == viewer_id
    }
}

/// One entry of the local thread: either a polled/confirmed message or an
/// optimistic send that the remote has not acknowledged yet.
///
/// The two copies of a sent message collapse into a single `Confirmed` entry
/// when the send resolves with the authoritative record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ThreadEntry {
    Confirmed(Message),
    PendingSend {
        local_id: Uuid,
        text: String,
        created_at: DateTime<Utc>,
    },
}

impl ThreadEntry {
    pub fn is_pending(&self) -> bool {
        matches!(self, ThreadEntry::PendingSend { .. })
    }

    pub fn text(&self) -> &str {
        match self {
            ThreadEntry::Confirmed(m) => &m.text,
            ThreadEntry::PendingSend { text, .. } => text,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            ThreadEntry::Confirmed(m) => m.created_at,
            ThreadEntry::PendingSend { created_at, .. } => *created_at,
        }
    }

    /// Ordering key: ascending by creation time, id as a deterministic
    /// tie-breaker.
    pub fn sort_key(&self) -> (DateTime<Utc>, Uuid) {
        match self {
            ThreadEntry::Confirmed(m) => (m.created_at, m.id),
            ThreadEntry::PendingSend {
                local_id,
                created_at,
                ..
            } => (*created_at, *local_id),
        }
    }

    pub fn confirmed(&self) -> Option<&Message> {
        match self {
            ThreadEntry::Confirmed(m) => Some(m),
            ThreadEntry::PendingSend { .. } => None,
        }
    }
}
