use crate::common::ChatMessage;
use crate::error::AppError;

/// Static notices appended to the conversation view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    ConnectionClosed,
    Unsupported,
}

impl Notice {
    pub fn text(self) -> &'static str {
        match self {
            Notice::ConnectionClosed => "Connection closed.",
            Notice::Unsupported => "Real-time chat is not supported here.",
        }
    }
}

/// Render callbacks the session drives. Implemented by the egui state and
/// by test recorders.
pub trait ChatView {
    fn set_title(&mut self, title: &str);

    /// `index` is the entry's position in the conversation log.
    fn render_message(&mut self, index: usize, message: &ChatMessage, outgoing: bool);

    fn render_location(&mut self, message: &ChatMessage, latitude: f64, longitude: f64);

    fn render_notice(&mut self, notice: Notice);

    /// Inline, user-visible error for the last action.
    fn show_error(&mut self, error: &AppError);

    fn is_at_bottom(&self) -> bool;

    fn scroll_to_bottom(&mut self);

    fn pending_input(&self) -> String;

    fn clear_input(&mut self);
}
