pub mod events;
pub mod types;

pub use events::{FetchOutcome, TransportEvent};
pub use types::{ChatMessage, CourseRecord, MessageKind, UnreadMessage, UserProfile, VolumeSearch};
