//! Transcript storage: the ordered list of messages shown to the user.

use crate::events::Message;

/// Append-only transcript. Always holds at least the greeting.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    revision: u64,
}

impl Transcript {
    /// Create a transcript containing only the assistant greeting
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::assistant(greeting)],
            revision: 0,
        }
    }

    /// Append a message. This is the only mutator.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.revision += 1;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Bumped on every append; views use it to snap to the newest entry
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
