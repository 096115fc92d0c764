pub mod app;
pub mod components;
pub mod state;
pub mod terminal;

pub use app::ChatApp;
pub use terminal::TerminalView;
