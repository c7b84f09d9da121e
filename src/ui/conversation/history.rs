//! Conversation history display component

use crate::events::{Message, Role};
use crate::store::Transcript;
use crate::ui::markdown::{render_markdown, render_plain};
use crate::ui::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

const BODY_INDENT: &str = "  ";

/// Scrollable view over the transcript.
///
/// Follows the newest entry: whenever the transcript revision changes the
/// view snaps back to the bottom.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    offset_from_bottom: usize,
    seen_revision: u64,
    ticks: u64,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snap to the newest entry if the transcript changed since last seen
    pub fn sync(&mut self, transcript: &Transcript) {
        if transcript.revision() != self.seen_revision {
            self.seen_revision = transcript.revision();
            self.scroll_to_bottom();
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.offset_from_bottom = self.offset_from_bottom.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.offset_from_bottom = self.offset_from_bottom.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset_from_bottom = 0;
    }

    pub fn offset_from_bottom(&self) -> usize {
        self.offset_from_bottom
    }

    /// Advance the pending-reply animation
    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
    }

    /// Lay out the whole transcript for the given width
    pub fn lines(&self, transcript: &Transcript, pending: bool, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for message in transcript.messages() {
            all_lines.extend(render_message(message, width));
            all_lines.push(Line::default());
        }

        if pending {
            all_lines.extend(self.render_pending());
        } else {
            all_lines.pop();
        }
        all_lines
    }

    /// Render into `area`, clamping the scroll offset to the content
    pub fn render(&mut self, transcript: &Transcript, pending: bool, area: Rect, buf: &mut Buffer) {
        self.sync(transcript);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Conversation ")
            .border_style(Theme::border(false));
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let lines = self.lines(transcript, pending, inner.width);
        let height = inner.height as usize;
        let max_offset = lines.len().saturating_sub(height);
        self.offset_from_bottom = self.offset_from_bottom.min(max_offset);

        let start = lines.len().saturating_sub(height + self.offset_from_bottom);
        for (i, line) in lines.iter().skip(start).take(height).enumerate() {
            buf.set_line(inner.x, inner.y + i as u16, line, inner.width);
        }

        if self.offset_from_bottom > 0 {
            let hint = Line::from(Span::styled(
                format!(" ↓ {} more ", self.offset_from_bottom),
                Theme::muted(),
            ));
            let y = inner.y + inner.height - 1;
            let x = inner.x + inner.width.saturating_sub(hint.width() as u16);
            buf.set_line(x, y, &hint, inner.width);
        }
    }

    fn render_pending(&self) -> Vec<Line<'static>> {
        let dots = match self.ticks % 4 {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "   ",
        };
        vec![
            header_line(Role::Assistant, None),
            Line::from(vec![
                Span::raw(BODY_INDENT),
                Span::styled(format!("Thinking{dots}"), Theme::muted()),
            ]),
        ]
    }
}

fn header_line(role: Role, message: Option<&Message>) -> Line<'static> {
    let style = match role {
        Role::User => Theme::user_header(),
        Role::Assistant => Theme::assistant_header(),
    };

    let mut spans = vec![Span::styled(
        format!("{} {}", role.icon(), role.display_name()),
        style,
    )];
    if let Some(message) = message {
        spans.push(Span::styled(
            format!(" · {}", message.sent_at().format("%H:%M:%S")),
            Theme::muted(),
        ));
    }
    Line::from(spans)
}

/// Render a single message: header line then the indented body
fn render_message(message: &Message, width: u16) -> Vec<Line<'static>> {
    let body_width = (width as usize).saturating_sub(BODY_INDENT.len());
    let body = match message.role() {
        Role::Assistant => render_markdown(message.content(), body_width),
        Role::User => render_plain(message.content(), body_width, Theme::user_text()),
    };

    let mut lines = vec![header_line(message.role(), Some(message))];
    lines.extend(body.into_iter().map(|line| {
        let mut spans = vec![Span::raw(BODY_INDENT)];
        spans.extend(line.spans);
        Line::from(spans)
    }));
    lines
}
