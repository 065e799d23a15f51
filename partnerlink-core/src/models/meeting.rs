use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Window after the scheduled time during which a meeting still counts as
/// active. Fixed by the product, not configurable.
pub const GRACE_PERIOD_SECS: i64 = 10 * 60;

pub fn grace_period() -> Duration {
    Duration::seconds(GRACE_PERIOD_SECS)
}

/// Stored lifecycle of a meeting.
///
/// The order matters: the stored status only ever moves forward along
/// `Pending -> Accepted -> Ended`, so merging a polled record with a local
/// one is `max(local, remote)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Pending,
    Accepted,
    Ended,
}

impl std::fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeetingStatus::Pending => write!(f, "pending"),
            MeetingStatus::Accepted => write!(f, "accepted"),
            MeetingStatus::Ended => write!(f, "ended"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Uuid,
    pub partnership_id: Uuid,
    pub organizer_user_id: Uuid,
    pub scheduled_time: DateTime<Utc>,
    pub status: MeetingStatus,
    /// Populated only once the meeting is accepted.
    pub meeting_link: Option<String>,
}

impl Meeting {
    pub fn is_organized_by(&self, viewer_id: Uuid) -> bool {
        self.organizer_user_id == viewer_id
    }

    /// Fold a polled record into this one. Remote fields win except that the
    /// stored status never moves backwards and a known meeting link is not
    /// forgotten while the remote still omits it.
    pub fn merge_remote(&mut self, remote: Meeting) {
        let status = self.status.max(remote.status);
        let link = remote.meeting_link.clone().or_else(|| self.meeting_link.take());
        *self = remote;
        self.status = status;
        self.meeting_link = link;
    }
}

/// Status shown to the viewer, derived purely from `(stored status,
/// scheduled time, now)`. The stored record is never mutated: any number of
/// clients independently agree on "ended" without coordination.
///
/// Advisory only. Client clocks skew, so this must never gate access.
pub fn compute_display_status(meeting: &Meeting, now: DateTime<Utc>) -> MeetingStatus {
    if meeting.status == MeetingStatus::Ended {
        return MeetingStatus::Ended;
    }
    if now > meeting.scheduled_time + grace_period() {
        MeetingStatus::Ended
    } else {
        meeting.status
    }
}

/// Human-readable remaining time, recomputed each tick from
/// `scheduled_time - now`. Reads "started" between the scheduled time and the
/// end of the grace period.
pub fn countdown_label(scheduled_time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = scheduled_time - now;
    if remaining <= Duration::zero() {
        return "started".to_string();
    }

    let total_secs = remaining.num_seconds();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_meeting(status: MeetingStatus, scheduled_time: DateTime<Utc>) -> Meeting {
        Meeting {
            id: Uuid::new_v4(),
            partnership_id: Uuid::new_v4(),
            organizer_user_id: Uuid::new_v4(),
            scheduled_time,
            status,
            meeting_link: None,
        }
    }

    #[test]
    fn test_status_ordering() {
        assert!(MeetingStatus::Pending < MeetingStatus::Accepted);
        assert!(MeetingStatus::Accepted < MeetingStatus::Ended);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(MeetingStatus::Pending.to_string(), "pending");
        assert_eq!(MeetingStatus::Accepted.to_string(), "accepted");
        assert_eq!(MeetingStatus::Ended.to_string(), "ended");
    }

    #[test]
    fn test_merge_remote_never_downgrades_status() {
        let now = Utc::now();
        let mut local = sample_meeting(MeetingStatus::Accepted, now);
        let mut remote = local.clone();
        remote.status = MeetingStatus::Pending;

        local.merge_remote(remote);
        assert_eq!(local.status, MeetingStatus::Accepted);
    }

    #[test]
    fn test_merge_remote_keeps_known_link() {
        let now = Utc::now();
        let mut local = sample_meeting(MeetingStatus::Accepted, now);
        local.meeting_link = Some("https://meet.example/abc".to_string());
        let remote = sample_meeting(MeetingStatus::Accepted, now);

        local.merge_remote(remote);
        assert_eq!(
            local.meeting_link.as_deref(),
            Some("https://meet.example/abc")
        );
    }

    #[test]
    fn test_merge_remote_takes_remote_link() {
        let now = Utc::now();
        let mut local = sample_meeting(MeetingStatus::Pending, now);
        let mut remote = local.clone();
        remote.status = MeetingStatus::Accepted;
        remote.meeting_link = Some("https://meet.example/xyz".to_string());

        local.merge_remote(remote);
        assert_eq!(local.status, MeetingStatus::Accepted);
        assert_eq!(
            local.meeting_link.as_deref(),
            Some("https://meet.example/xyz")
        );
    }

    #[test]
    fn test_display_status_pure_and_does_not_mutate() {
        let now = Utc::now();
        let meeting = sample_meeting(MeetingStatus::Accepted, now - Duration::minutes(30));

        let first = compute_display_status(&meeting, now);
        let second = compute_display_status(&meeting, now);
        assert_eq!(first, second);
        assert_eq!(first, MeetingStatus::Ended);
        // Stored status is untouched by the derivation.
        assert_eq!(meeting.status, MeetingStatus::Accepted);
    }

    #[test]
    fn test_display_status_grace_period_boundaries() {
        let now = Utc::now();
        let meeting = sample_meeting(MeetingStatus::Accepted, now);

        // 9m59s after the scheduled time: still accepted.
        let at = meeting.scheduled_time + Duration::seconds(9 * 60 + 59);
        assert_eq!(compute_display_status(&meeting, at), MeetingStatus::Accepted);

        // 10m01s after: ended.
        let at = meeting.scheduled_time + Duration::seconds(10 * 60 + 1);
        assert_eq!(compute_display_status(&meeting, at), MeetingStatus::Ended);
    }

    #[test]
    fn test_pending_meeting_silently_expires() {
        let now = Utc::now();
        let meeting = sample_meeting(MeetingStatus::Pending, now - Duration::minutes(11));
        assert_eq!(compute_display_status(&meeting, now), MeetingStatus::Ended);
    }

    #[test]
    fn test_ended_is_terminal() {
        let now = Utc::now();
        let meeting = sample_meeting(MeetingStatus::Ended, now + Duration::hours(1));
        assert_eq!(compute_display_status(&meeting, now), MeetingStatus::Ended);
    }

    #[test]
    fn test_countdown_label_formats() {
        let now = Utc::now();

        let label = countdown_label(now + Duration::seconds(3600 + 125), now);
        assert_eq!(label, "1h 2m 5s");

        let label = countdown_label(now + Duration::seconds(59 * 60 + 30), now);
        assert_eq!(label, "59m 30s");

        let label = countdown_label(now + Duration::seconds(42), now);
        assert_eq!(label, "42s");
    }

    #[test]
    fn test_countdown_label_started() {
        let now = Utc::now();
        assert_eq!(countdown_label(now, now), "started");
        assert_eq!(countdown_label(now - Duration::minutes(3), now), "started");
    }
}
