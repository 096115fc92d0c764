use crate::common::ChatMessage;

/// Arrival-ordered log of one conversation. Entries are never edited or
/// removed; identical messages are kept as separate entries.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<ChatMessage>,
    seeded: bool,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load history given newest-first. Only the first call has an effect;
    /// `None` or an empty list still marks the store as seeded.
    ///
    /// Returns the number of entries appended.
    pub fn seed(&mut self, history: Option<Vec<ChatMessage>>) -> usize {
        if self.seeded {
            log::warn!("Ignoring repeated history seed");
            return 0;
        }
        self.seeded = true;

        let Some(history) = history else {
            return 0;
        };
        let count = history.len();
        self.messages.extend(history.into_iter().rev());
        count
    }

    /// Append and return the new entry's position.
    pub fn append(&mut self, message: ChatMessage) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Log order, oldest first. The iterator can be cloned to restart it.
    pub fn all(&self) -> impl Iterator<Item = &ChatMessage> + Clone + '_ {
        self.messages.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }
}
