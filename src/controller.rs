//! Conversation controller: the send / settle state machine around the
//! transcript.
//!
//! A send is split in two phases. Phase 1 ([`ChatEvent::Submit`]) is
//! synchronous: it validates the input, appends the user's message and enters
//! [`Phase::Sending`], returning the [`Outbound`] request to issue. Phase 2
//! ([`ChatEvent::Settle`]) appends exactly one assistant message, either the
//! reply or the fallback text, and returns to [`Phase::Idle`].

use crate::api::ChatBackend;
use crate::error::SendResult;
use crate::events::Message;
use crate::store::Transcript;

/// Shown in place of the reply whenever a round trip fails
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
}

/// Outcome of a round trip, collapsed for the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Reply(String),
    Fallback,
}

impl Settlement {
    /// Collapse a backend result; failures are logged and never surfaced
    pub fn from_result(result: SendResult<String>) -> Self {
        match result {
            Ok(text) => Settlement::Reply(text),
            Err(error) => {
                tracing::warn!(%error, "chat round trip failed");
                Settlement::Fallback
            }
        }
    }

    /// Text appended to the transcript for this outcome
    pub fn into_content(self) -> String {
        match self {
            Settlement::Reply(text) => text,
            Settlement::Fallback => FALLBACK_REPLY.to_string(),
        }
    }

    pub fn is_reply(&self) -> bool {
        matches!(self, Settlement::Reply(_))
    }
}

/// Transitions accepted by [`ConversationState::apply`]
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// User asked to send this text
    Submit(String),
    /// The in-flight round trip finished
    Settle(Settlement),
}

/// Request produced by an accepted submit
#[derive(Debug, Clone)]
pub struct Outbound {
    /// Trimmed user text
    pub message: String,
    /// Transcript as it was before `message` was appended
    pub history: Vec<Message>,
}

/// Transcript plus busy flag, owned by whoever drives the conversation
#[derive(Debug, Clone)]
pub struct ConversationState {
    transcript: Transcript,
    phase: Phase,
}

impl ConversationState {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            transcript: Transcript::new(greeting),
            phase: Phase::Idle,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase == Phase::Sending
    }

    /// Apply one transition. Returns the request to issue when a submit is
    /// accepted, `None` otherwise.
    pub fn apply(&mut self, event: ChatEvent) -> Option<Outbound> {
        match event {
            ChatEvent::Submit(text) => self.submit(&text),
            ChatEvent::Settle(settlement) => {
                self.settle(settlement);
                None
            }
        }
    }

    fn submit(&mut self, text: &str) -> Option<Outbound> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        if self.is_busy() {
            tracing::debug!("ignoring send while a round trip is in flight");
            return None;
        }

        let history = self.transcript.messages().to_vec();
        self.transcript.append(Message::user(trimmed));
        self.phase = Phase::Sending;

        Some(Outbound {
            message: trimmed.to_string(),
            history,
        })
    }

    fn settle(&mut self, settlement: Settlement) {
        if !self.is_busy() {
            tracing::warn!("dropping settlement with no round trip in flight");
            return;
        }

        self.transcript.append(Message::assistant(settlement.into_content()));
        self.phase = Phase::Idle;
    }
}

/// Drives a [`ConversationState`] against a backend, awaiting each round trip
pub struct ConversationController<B> {
    state: ConversationState,
    backend: B,
}

impl<B: ChatBackend> ConversationController<B> {
    pub fn new(backend: B, greeting: impl Into<String>) -> Self {
        Self {
            state: ConversationState::new(greeting),
            backend,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        self.state.transcript()
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Send one message and wait for the round trip to settle.
    ///
    /// Returns `None` when the input was empty (nothing happened), otherwise
    /// the settlement that was appended.
    pub async fn send(&mut self, text: &str) -> Option<Settlement> {
        let outbound = self.state.apply(ChatEvent::Submit(text.to_string()))?;

        let result = self
            .backend
            .send_message(&outbound.message, &outbound.history)
            .await;
        let settlement = Settlement::from_result(result);

        self.state.apply(ChatEvent::Settle(settlement.clone()));
        Some(settlement)
    }
}
