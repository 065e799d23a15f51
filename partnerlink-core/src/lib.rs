#![allow(
    clippy::type_complexity,
    clippy::len_zero,
    dead_code,
    unused_imports
)]

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod sync;

pub use api::{HttpPartnershipApi, PartnershipApi};
pub use config::{
    ApiConfig, ConfigLoadError, LoggingConfig, MessageConfig, PanelConfig, PollingConfig,
};
pub use error::{PanelError, PanelResult};
pub use models::{
    compute_display_status, countdown_label, grace_period, Meeting, MeetingStatus, Message,
    PartnerRole, ThreadEntry, GRACE_PERIOD_SECS,
};
pub use sync::{
    CollectionStatus, LivenessGate, MeetingTracker, MeetingView, MessageSynchronizer, MessageView,
    PartnershipPanel, RefreshOutcome,
};
