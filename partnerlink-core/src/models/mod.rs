pub mod meeting;
pub mod message;

pub use meeting::{
    compute_display_status, countdown_label, grace_period, Meeting, MeetingStatus,
    GRACE_PERIOD_SECS,
};
pub use message::{Message, PartnerRole, ThreadEntry};
