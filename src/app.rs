//! Interactive terminal session

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};

use crate::api::ChatBackend;
use crate::config::Config;
use crate::events::AppEvent;
use crate::ui::conversation::{ConversationAction, ConversationManager};
use crate::ui::{EventHandler, Theme};

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Owns the terminal for the lifetime of the session and restores it on drop
pub struct App<B> {
    terminal: Term,
    events: EventHandler,
    manager: ConversationManager<B>,
    title: String,
    subtitle: String,
    should_quit: bool,
}

impl<B> App<B>
where
    B: ChatBackend + Clone + Send + Sync + 'static,
{
    pub fn new(config: &Config, backend: B) -> Result<Self> {
        enable_raw_mode()?;
        let terminal = undo_on_error(enter_terminal, restore_terminal)?;

        let events = EventHandler::new(Duration::from_millis(config.ui.tick_rate_ms.max(16)));
        let manager = ConversationManager::new(backend, config.greeting.clone(), events.sender());

        Ok(Self {
            terminal,
            events,
            manager,
            title: config.ui.title.clone(),
            subtitle: config.ui.subtitle.clone(),
            should_quit: false,
        })
    }

    /// Run the main event loop
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("interactive session started");

        while !self.should_quit {
            let Self {
                terminal,
                manager,
                title,
                subtitle,
                ..
            } = self;
            terminal.draw(|frame| draw(frame, manager, title, subtitle))?;

            match self.events.next().await {
                Some(event) => self.handle_event(event)?,
                None => break,
            }
        }

        tracing::info!(
            messages = self.manager.transcript().len(),
            "interactive session ended"
        );
        Ok(())
    }

    fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Key(key) => {
                if is_quit_key(&key) {
                    self.should_quit = true;
                } else if self.manager.handle_key(key) == ConversationAction::Exit {
                    self.should_quit = true;
                }
            }
            AppEvent::Paste(text) => self.manager.handle_paste(&text),
            AppEvent::Resize(_, _) => {}
            AppEvent::Tick => self.manager.tick(),
            AppEvent::Settled(settlement) => self.manager.settle(settlement),
            AppEvent::InputError(error) => {
                tracing::error!(%error, "terminal input failed");
                return Err(anyhow!("terminal input failed: {error}"));
            }
        }
        Ok(())
    }
}

impl<B> Drop for App<B> {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableBracketedPaste
        );
        let _ = self.terminal.show_cursor();
    }
}

fn enter_terminal() -> Result<Term> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

/// Best-effort restore for when setup fails before an `App` exists to drop
fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste);
}

/// Run `setup`, calling `undo` if it fails
fn undo_on_error<T>(setup: impl FnOnce() -> Result<T>, undo: impl FnOnce()) -> Result<T> {
    setup().inspect_err(|_| undo())
}

/// Start the interactive UI and block until the user quits
pub async fn run<B>(config: &Config, backend: B) -> Result<()>
where
    B: ChatBackend + Clone + Send + Sync + 'static,
{
    let mut app = App::new(config, backend)?;
    app.run().await
}

fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    matches!(key.code, KeyCode::Esc)
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

fn draw<B>(frame: &mut Frame, manager: &mut ConversationManager<B>, title: &str, subtitle: &str)
where
    B: ChatBackend + Clone + Send + Sync + 'static,
{
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(6),    // Conversation
            Constraint::Length(1), // Status
        ])
        .split(frame.size());

    render_header(frame, chunks[0], title, subtitle);
    manager.render(chunks[1], frame.buffer_mut());
    render_status(frame, chunks[2], manager);
}

fn render_header(frame: &mut Frame, area: Rect, title: &str, subtitle: &str) {
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            title.to_string(),
            Style::default()
                .fg(Theme::PRIMARY)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(subtitle.to_string(), Theme::muted())),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Theme::border(false)),
    );
    frame.render_widget(header, area);
}

fn render_status<B>(frame: &mut Frame, area: Rect, manager: &ConversationManager<B>)
where
    B: ChatBackend + Clone + Send + Sync + 'static,
{
    let text = if manager.is_busy() {
        "Waiting for the assistant… · PgUp/PgDn scroll · Esc quit".to_string()
    } else {
        match manager.status() {
            Some(status) => status.to_string(),
            None => "Enter send · /help for commands · Esc quit".to_string(),
        }
    };
    frame.render_widget(Paragraph::new(Span::styled(text, Theme::muted())), area);
}
