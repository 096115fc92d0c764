use std::io::{self, Write};

use crate::common::ChatMessage;
use crate::error::AppError;
use crate::session::{ChatView, Notice};

/// Line-oriented view for `chat --headless`. A terminal always follows the
/// latest line, so it is always at the bottom.
pub struct TerminalView<W: Write> {
    out: W,
    pub input: String,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            input: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}") {
            log::warn!("Failed to write to terminal: {err}");
        }
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn set_title(&mut self, title: &str) {
        self.line(&format!("== {title} =="));
    }

    fn render_message(&mut self, _index: usize, message: &ChatMessage, outgoing: bool) {
        let who = if outgoing { "me" } else { "them" };
        self.line(&format!("[{who}] {}", message.message));
    }

    fn render_location(&mut self, message: &ChatMessage, latitude: f64, longitude: f64) {
        self.line(&format!(
            "   * {} ({latitude:.4}, {longitude:.4})",
            message.message
        ));
    }

    fn render_notice(&mut self, notice: Notice) {
        self.line(&format!("** {} **", notice.text()));
    }

    fn show_error(&mut self, error: &AppError) {
        self.line(&format!("!! {error}"));
    }

    fn is_at_bottom(&self) -> bool {
        true
    }

    fn scroll_to_bottom(&mut self) {}

    fn pending_input(&self) -> String {
        self.input.clone()
    }

    fn clear_input(&mut self) {
        self.input.clear();
    }
}
