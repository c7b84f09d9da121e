//! Color palette for the terminal UI

use ratatui::style::{Color, Modifier, Style};

pub struct Theme;

impl Theme {
    pub const PRIMARY: Color = Color::Rgb(124, 58, 237);
    pub const SECONDARY: Color = Color::Rgb(6, 182, 212);
    pub const ACCENT: Color = Color::Rgb(236, 72, 153);
    pub const TEXT: Color = Color::Rgb(229, 231, 235);
    pub const MUTED: Color = Color::Rgb(156, 163, 175);
    pub const BORDER: Color = Color::Rgb(63, 53, 83);
    pub const CODE: Color = Color::Rgb(167, 139, 250);
    pub const LINK: Color = Color::Rgb(196, 181, 253);

    pub fn text() -> Style {
        Style::default().fg(Self::TEXT)
    }

    pub fn muted() -> Style {
        Style::default().fg(Self::MUTED)
    }

    pub fn user_text() -> Style {
        Style::default().fg(Color::White)
    }

    pub fn user_header() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn assistant_header() -> Style {
        Style::default()
            .fg(Self::SECONDARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(focused: bool) -> Style {
        if focused {
            Style::default().fg(Self::PRIMARY)
        } else {
            Style::default().fg(Self::BORDER)
        }
    }
}
