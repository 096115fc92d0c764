use super::types::{ChatMessage, UserProfile};

/// What the transport reports back to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Message(ChatMessage),
    /// Yielded at most once per connection.
    Closed,
}

/// Results of the startup fetches, delivered from their spawned tasks.
#[derive(Debug)]
pub enum FetchOutcome {
    History(crate::error::Result<Option<Vec<ChatMessage>>>),
    Profile(crate::error::Result<UserProfile>),
}
