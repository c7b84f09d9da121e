use crate::api::ChatBackend;
use crate::controller::{ChatEvent, ConversationState, Settlement};
use crate::events::AppEvent;
use crate::store::Transcript;
use crate::ui::conversation::commands::{ParsedCommand, SlashCommand, HELP_TEXT};
use crate::ui::conversation::composer::{ComposerResult, ConversationComposer};
use crate::ui::conversation::history::ConversationHistory;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
};
use tokio::sync::mpsc;

const PLACEHOLDER: &str = "Type your message...";
const PAGE: usize = 10;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Manages the conversation flow and UI components.
///
/// Owns the conversation state; round trips run on spawned tasks and come
/// back as [`AppEvent::Settled`] through the application event channel.
pub struct ConversationManager<B> {
    state: ConversationState,
    history: ConversationHistory,
    composer: ConversationComposer,
    backend: B,
    events: mpsc::UnboundedSender<AppEvent>,
    status: Option<String>,
}

impl<B> ConversationManager<B>
where
    B: ChatBackend + Clone + Send + Sync + 'static,
{
    pub fn new(
        backend: B,
        greeting: impl Into<String>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            state: ConversationState::new(greeting),
            history: ConversationHistory::new(),
            composer: ConversationComposer::new(PLACEHOLDER),
            backend,
            events,
            status: None,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        self.state.transcript()
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn composer(&self) -> &ConversationComposer {
        &self.composer
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        match key.code {
            KeyCode::PageUp => {
                self.history.scroll_up(PAGE);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.history.scroll_down(PAGE);
                return ConversationAction::None;
            }
            KeyCode::Up if self.composer.is_empty() => {
                self.history.scroll_up(1);
                return ConversationAction::None;
            }
            KeyCode::Down if self.composer.is_empty() => {
                self.history.scroll_down(1);
                return ConversationAction::None;
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(input) => {
                self.status = None;
                self.submit(input);
                ConversationAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        self.composer.insert_str(text);
    }

    /// Phase 1: append the user's message and start the round trip
    pub fn submit(&mut self, input: String) {
        let Some(outbound) = self.state.apply(ChatEvent::Submit(input)) else {
            return;
        };
        self.composer.set_enabled(false);

        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend
                .send_message(&outbound.message, &outbound.history)
                .await;
            let settlement = Settlement::from_result(result);
            if events.send(AppEvent::Settled(settlement)).is_err() {
                tracing::debug!("event channel closed before settlement was delivered");
            }
        });
    }

    /// Phase 2: append the assistant's message and re-enable input
    pub fn settle(&mut self, settlement: Settlement) {
        self.state.apply(ChatEvent::Settle(settlement));
        self.composer.set_enabled(true);
    }

    pub fn tick(&mut self) {
        if self.state.is_busy() {
            self.history.tick();
        }
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        match command.command {
            SlashCommand::Quit => ConversationAction::Exit,
            SlashCommand::Help => {
                self.status = Some(HELP_TEXT.clone());
                ConversationAction::None
            }
        }
    }

    /// Render transcript and composer
    pub fn render(&mut self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // History
                Constraint::Length(3), // Composer
            ])
            .split(area);

        let pending = self.state.is_busy();
        self.history
            .render(self.state.transcript(), pending, chunks[0], buf);
        ratatui::widgets::Widget::render(&self.composer, chunks[1], buf);
    }
}
