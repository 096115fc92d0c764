use crate::common::ChatMessage;
use crate::error::AppError;
use crate::notifications::NotificationFeed;
use crate::session::{ChatView, Notice};

/// One rendered row of the conversation pane.
#[derive(Debug, Clone, PartialEq)]
pub enum LogLine {
    Message {
        text: String,
        outgoing: bool,
        time: Option<String>,
    },
    /// Location updates are shown centered and are not part of the log.
    Location(String),
    Notice(String),
}

/// UI-local state of the chat window.
pub struct ChatViewState {
    pub title: String,
    pub lines: Vec<LogLine>,
    pub input_text: String,
    pub error: Option<String>,
    pub last_location: Option<(f64, f64)>,
    /// Updated by the chat area every frame.
    pub at_bottom: bool,
    pub scroll_requested: bool,
    pub notifications: NotificationFeed,
}

impl ChatViewState {
    pub fn new(receiver_id: i64) -> Self {
        Self {
            title: format!("Messaging user {receiver_id}"),
            lines: Vec::new(),
            input_text: String::new(),
            error: None,
            last_location: None,
            at_bottom: true,
            scroll_requested: false,
            notifications: NotificationFeed::default(),
        }
    }
}

impl ChatView for ChatViewState {
    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn render_message(&mut self, _index: usize, message: &ChatMessage, outgoing: bool) {
        self.lines.push(LogLine::Message {
            text: message.message.clone(),
            outgoing,
            time: message
                .created_at
                .map(|at| at.format("%b %d %H:%M").to_string()),
        });
    }

    fn render_location(&mut self, message: &ChatMessage, latitude: f64, longitude: f64) {
        self.last_location = Some((latitude, longitude));
        self.lines.push(LogLine::Location(message.message.clone()));
    }

    fn render_notice(&mut self, notice: Notice) {
        self.lines.push(LogLine::Notice(notice.text().to_string()));
    }

    fn show_error(&mut self, error: &AppError) {
        self.error = Some(match error {
            AppError::NotConnected => "Not connected; the message was not sent.".to_string(),
            other => other.to_string(),
        });
    }

    fn is_at_bottom(&self) -> bool {
        self.at_bottom
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_requested = true;
    }

    fn pending_input(&self) -> String {
        self.input_text.clone()
    }

    /// Called after a successful send, which also retires the last error.
    fn clear_input(&mut self) {
        self.input_text.clear();
        self.error = None;
    }
}
