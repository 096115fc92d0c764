pub mod controller;
pub mod view;

pub use controller::SessionController;
pub use view::{ChatView, Notice};
