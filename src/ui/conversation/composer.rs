use crate::ui::conversation::commands::{parse_slash_command, ParsedCommand};
use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use unicode_width::UnicodeWidthChar;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// State for the single-line text input. `cursor` counts chars, not bytes.
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    pub cursor: usize,
}

impl TextAreaState {
    fn byte_index(&self, cursor: usize) -> usize {
        self.content
            .char_indices()
            .nth(cursor)
            .map(|(index, _)| index)
            .unwrap_or(self.content.len())
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Message input at the bottom of the screen
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    state: TextAreaState,
    placeholder: String,
    enabled: bool,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            state: TextAreaState::default(),
            placeholder: placeholder.into(),
            enabled: true,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press || !self.enabled {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if self.state.content.trim().is_empty() {
                    return ComposerResult::None;
                }
                let content = std::mem::take(&mut self.state.content);
                self.state.cursor = 0;
                if let Some(command) = parse_slash_command(&content) {
                    return ComposerResult::Command(command);
                }
                return ComposerResult::Submitted(content);
            }
            KeyCode::Char(c) => self.insert_char(c),
            KeyCode::Backspace => {
                if self.state.cursor > 0 {
                    self.state.cursor -= 1;
                    let index = self.state.byte_index(self.state.cursor);
                    self.state.content.remove(index);
                }
            }
            KeyCode::Delete => {
                if self.state.cursor < self.state.char_len() {
                    let index = self.state.byte_index(self.state.cursor);
                    self.state.content.remove(index);
                }
            }
            KeyCode::Left => {
                self.state.cursor = self.state.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.state.cursor < self.state.char_len() {
                    self.state.cursor += 1;
                }
            }
            KeyCode::Home => self.state.cursor = 0,
            KeyCode::End => self.state.cursor = self.state.char_len(),
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor
    pub fn insert_str(&mut self, text: &str) {
        if !self.enabled {
            return;
        }
        for c in text.chars() {
            self.insert_char(c);
        }
    }

    fn insert_char(&mut self, c: char) {
        let index = self.state.byte_index(self.state.cursor);
        self.state.content.insert(index, c);
        self.state.cursor += 1;
    }

    /// Enable or disable input; disabled while a round trip is in flight
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_empty(&self) -> bool {
        self.state.content.is_empty()
    }

    pub fn content(&self) -> &str {
        &self.state.content
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.enabled {
            " Message "
        } else {
            " Waiting for reply… "
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Theme::border(self.enabled));

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        if self.state.content.is_empty() {
            let placeholder = Line::from(Span::styled(self.placeholder.as_str(), Theme::muted()));
            buf.set_line(inner.x, inner.y, &placeholder, inner.width);
            return;
        }

        // Horizontal window, measured in columns, that keeps the cursor visible
        let chars: Vec<char> = self
            .state
            .content
            .chars()
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        let visible = (inner.width as usize).saturating_sub(1).max(1);
        let cursor = self.state.cursor.min(chars.len());
        let column_width = |c: char| c.width().unwrap_or(0);

        let mut used = 0;
        let mut start = cursor;
        while start > 0 && used + column_width(chars[start - 1]) <= visible {
            used += column_width(chars[start - 1]);
            start -= 1;
        }
        let mut end = cursor;
        while end < chars.len() && used + column_width(chars[end]) <= visible {
            used += column_width(chars[end]);
            end += 1;
        }

        let before: String = chars[start..cursor].iter().collect();
        let after: String = chars[cursor..end].iter().collect();

        let text_style = if self.enabled {
            Theme::text()
        } else {
            Theme::muted()
        };
        let mut spans = vec![Span::styled(before, text_style)];
        if self.enabled {
            spans.push(Span::styled("▌", Style::default().fg(Theme::PRIMARY)));
        }
        spans.push(Span::styled(after, text_style));

        buf.set_line(inner.x, inner.y, &Line::from(spans), inner.width);
    }
}
