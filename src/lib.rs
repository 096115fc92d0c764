//! Client for the campus textbook marketplace: two-party chat over the
//! backend's `/ws` socket, unread-message notifications, and book/course
//! lookups for listings.

pub mod catalog;
pub mod common;
pub mod config;
pub mod error;
pub mod network;
pub mod notifications;
pub mod session;
pub mod storage;
#[cfg(test)]
mod test_support;
pub mod ui;

pub use error::{AppError, Result};
