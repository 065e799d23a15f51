pub mod meetings;
pub mod messages;
pub mod orchestrator;
pub mod types;

pub use meetings::{MeetingTracker, MeetingView};
pub use messages::{MessageSynchronizer, MessageView};
pub use orchestrator::PartnershipPanel;
pub use types::{CollectionStatus, LivenessGate, RefreshOutcome};
