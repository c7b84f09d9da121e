//! Markdown to styled terminal lines
//!
//! Assistant replies are parsed with pulldown-cmark and flattened into
//! word-wrapped ratatui lines. Handles headings, emphasis, strong,
//! strikethrough, inline code, code blocks, ordered and unordered lists,
//! task markers, links, blockquotes and horizontal rules.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::theme::Theme;

/// Render markdown into lines no wider than `width` columns
pub fn render_markdown(source: &str, width: usize) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut renderer = Renderer::new(width);
    for event in Parser::new_ext(source, options) {
        renderer.handle(event);
    }
    renderer.finish()
}

/// Render text literally, wrapping each source line to `width`
pub fn render_plain(text: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    text.split('\n')
        .flat_map(|raw| {
            wrap_spans(
                vec![Span::styled(raw.to_string(), style)],
                width,
                Vec::new(),
                Vec::new(),
                true,
            )
        })
        .collect()
}

fn heading_style(level: HeadingLevel) -> Style {
    let style = Style::default()
        .fg(Theme::CODE)
        .add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 => style.add_modifier(Modifier::UNDERLINED),
        _ => style,
    }
}

fn code_style() -> Style {
    Style::default().fg(Theme::CODE)
}

fn quote_style() -> Style {
    Style::default()
        .fg(Theme::MUTED)
        .add_modifier(Modifier::ITALIC)
}

struct ListState {
    next_number: Option<u64>,
    marker_width: usize,
}

struct LinkState {
    url: String,
    text: String,
}

struct Renderer {
    width: usize,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    lists: Vec<ListState>,
    quote_depth: usize,
    pending_marker: Option<String>,
    link: Option<LinkState>,
    code_block: Option<String>,
    last_blank: bool,
}

impl Renderer {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            current: Vec::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            pending_marker: None,
            link: None,
            code_block: None,
            last_blank: false,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_else(Theme::text)
    }

    fn push_modifier(&mut self, modifier: Modifier) {
        let style = self.style().add_modifier(modifier);
        self.styles.push(style);
    }

    fn push_text(&mut self, text: String, style: Style) {
        if let Some(link) = self.link.as_mut() {
            link.text.push_str(&text);
        }
        self.current.push(Span::styled(text, style));
    }

    fn handle(&mut self, event: Event<'_>) {
        if let Some(buffer) = self.code_block.as_mut() {
            match &event {
                Event::Text(text) => {
                    buffer.push_str(text);
                    return;
                }
                Event::End(TagEnd::CodeBlock) => {}
                _ => return,
            }
        }

        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                let style = self.style();
                self.push_text(text.into_string(), style);
            }
            Event::Code(code) => self.push_text(code.into_string(), code_style()),
            Event::SoftBreak => {
                let style = self.style();
                self.push_text(" ".to_string(), style);
            }
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                let rule = "─".repeat(self.width.clamp(3, 80));
                self.lines.push(Line::from(Span::styled(rule, Theme::muted())));
                self.last_blank = false;
                self.blank_line();
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_text(marker.to_string(), Style::default().fg(Theme::ACCENT));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let style = self.style();
                self.push_text(html.trim_end_matches('\n').to_string(), style);
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {}
            Tag::Heading { level, .. } => {
                self.flush_line();
                self.styles.push(heading_style(level));
            }
            Tag::BlockQuote => {
                self.flush_line();
                self.quote_depth += 1;
                self.styles.push(quote_style());
            }
            Tag::CodeBlock(_) => {
                self.flush_line();
                self.code_block = Some(String::new());
            }
            Tag::List(start) => {
                self.flush_line();
                self.lists.push(ListState {
                    next_number: start,
                    marker_width: 2,
                });
            }
            Tag::Item => {
                self.flush_line();
                if let Some(list) = self.lists.last_mut() {
                    let marker = match list.next_number.as_mut() {
                        Some(n) => {
                            let marker = format!("{n}. ");
                            *n += 1;
                            marker
                        }
                        None => "• ".to_string(),
                    };
                    list.marker_width = marker.width();
                    self.pending_marker = Some(marker);
                }
            }
            Tag::Emphasis => self.push_modifier(Modifier::ITALIC),
            Tag::Strong => self.push_modifier(Modifier::BOLD),
            Tag::Strikethrough => self.push_modifier(Modifier::CROSSED_OUT),
            Tag::Link { dest_url, .. } => {
                self.styles.push(
                    Style::default()
                        .fg(Theme::LINK)
                        .add_modifier(Modifier::UNDERLINED),
                );
                self.link = Some(LinkState {
                    url: dest_url.into_string(),
                    text: String::new(),
                });
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_line();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Heading(_) => {
                self.flush_line();
                self.styles.pop();
                self.blank_line();
            }
            TagEnd::BlockQuote => {
                self.flush_line();
                self.styles.pop();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank_line();
            }
            TagEnd::CodeBlock => {
                let code = self.code_block.take().unwrap_or_default();
                self.emit_code_block(&code);
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::List(_) => {
                self.flush_line();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => {
                self.flush_line();
                self.pending_marker = None;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                if let Some(link) = self.link.take() {
                    if !link.url.is_empty() && link.url != link.text {
                        self.current
                            .push(Span::styled(format!(" ({})", link.url), Theme::muted()));
                    }
                }
            }
            _ => {}
        }
    }

    /// Prefix spans for the first and continuation lines of the current block
    fn prefixes(&mut self) -> (Vec<Span<'static>>, Vec<Span<'static>>) {
        let mut base = Vec::new();
        for _ in 0..self.quote_depth {
            base.push(Span::styled("│ ", Style::default().fg(Theme::PRIMARY)));
        }

        let Some(list) = self.lists.last() else {
            return (base.clone(), base);
        };

        let indent = "  ".repeat(self.lists.len() - 1);
        let hanging = " ".repeat(list.marker_width);
        let mut rest = base.clone();
        rest.push(Span::raw(format!("{indent}{hanging}")));

        let mut first = base;
        match self.pending_marker.take() {
            Some(marker) => {
                first.push(Span::raw(indent));
                first.push(Span::styled(marker, Style::default().fg(Theme::ACCENT)));
            }
            None => first.push(Span::raw(format!("{indent}{hanging}"))),
        }
        (first, rest)
    }

    fn flush_line(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.current);
        let (first, rest) = self.prefixes();
        self.lines
            .extend(wrap_spans(spans, self.width, first, rest, true));
        self.last_blank = false;
    }

    fn emit_code_block(&mut self, code: &str) {
        let (mut first, mut rest) = self.prefixes();
        first.push(Span::raw("  "));
        rest.push(Span::raw("  "));

        for raw in code.trim_end_matches('\n').split('\n') {
            let spans = vec![Span::styled(raw.to_string(), code_style())];
            self.lines
                .extend(wrap_spans(spans, self.width, first.clone(), rest.clone(), false));
        }
        self.last_blank = false;
    }

    fn blank_line(&mut self) {
        if self.lines.is_empty() || self.last_blank {
            return;
        }
        let bars: Vec<Span<'static>> = (0..self.quote_depth)
            .map(|_| Span::styled("│ ", Style::default().fg(Theme::PRIMARY)))
            .collect();
        self.lines.push(Line::from(bars));
        self.last_blank = true;
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_line();
        if self.last_blank {
            self.lines.pop();
        }
        self.lines
    }
}

fn span_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|s| s.content.width()).sum()
}

/// Split into alternating runs of whitespace and non-whitespace
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (index, c) in text.char_indices() {
        let space = c.is_whitespace();
        match in_space {
            Some(previous) if previous != space => {
                tokens.push(&text[start..index]);
                start = index;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Split off the longest head that fits in `columns`. With `force`, the head
/// holds at least one char even if that glyph is wider than `columns`.
fn split_at_width(text: &str, columns: usize, force: bool) -> (&str, &str) {
    let mut used = 0;
    for (index, c) in text.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > columns {
            if index == 0 && force {
                return text.split_at(c.len_utf8());
            }
            return text.split_at(index);
        }
        used += w;
    }
    (text, "")
}

/// Word-wrap styled spans to `width` columns.
///
/// `first_prefix` starts the first line and `rest_prefix` every continuation
/// line. Words longer than a line are split. With `trim_wrapped`, whitespace
/// that lands at a wrap point is dropped.
pub fn wrap_spans(
    spans: Vec<Span<'static>>,
    width: usize,
    first_prefix: Vec<Span<'static>>,
    rest_prefix: Vec<Span<'static>>,
    trim_wrapped: bool,
) -> Vec<Line<'static>> {
    let rest_width = span_width(&rest_prefix);
    let min_width = span_width(&first_prefix).max(rest_width) + 1;
    let width = if width < min_width { usize::MAX } else { width };

    let mut lines = Vec::new();
    let mut line_start = span_width(&first_prefix);
    let mut used = line_start;
    let mut keep = first_prefix.len();
    let mut line = first_prefix;

    for span in spans {
        let style = span.style;
        for token in tokenize(&span.content) {
            let is_space = token.chars().all(char::is_whitespace);
            let len = token.width();

            if used + len > width && used > line_start {
                if trim_wrapped {
                    trim_trailing_space(&mut line, keep);
                }
                lines.push(Line::from(std::mem::replace(&mut line, rest_prefix.clone())));
                used = rest_width;
                line_start = rest_width;
                keep = rest_prefix.len();
                if is_space && trim_wrapped {
                    continue;
                }
            }

            let mut remaining = token;
            while used + remaining.width() > width {
                let (head, tail) =
                    split_at_width(remaining, width.saturating_sub(used), used == line_start);
                if tail.is_empty() {
                    break;
                }
                if !head.is_empty() {
                    line.push(Span::styled(head.to_string(), style));
                }
                lines.push(Line::from(std::mem::replace(&mut line, rest_prefix.clone())));
                used = rest_width;
                line_start = rest_width;
                keep = rest_prefix.len();
                remaining = tail;
            }

            if !remaining.is_empty() {
                used += remaining.width();
                line.push(Span::styled(remaining.to_string(), style));
            }
        }
    }

    if trim_wrapped {
        trim_trailing_space(&mut line, keep);
    }
    lines.push(Line::from(line));
    lines
}

/// Drop trailing whitespace from content spans, leaving the first `keep`
/// (prefix) spans alone
fn trim_trailing_space(line: &mut Vec<Span<'static>>, keep: usize) {
    while line.len() > keep {
        let Some(last) = line.last_mut() else {
            return;
        };
        let trimmed = last.content.trim_end().to_string();
        if trimmed.is_empty() {
            line.pop();
            continue;
        }
        if trimmed.len() != last.content.len() {
            last.content = trimmed.into();
        }
        return;
    }
}
