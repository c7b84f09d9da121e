pub mod conversation;
pub mod event;
pub mod markdown;
pub mod theme;

pub use event::EventHandler;
pub use theme::Theme;
