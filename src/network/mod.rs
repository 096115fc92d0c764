pub mod api;
pub mod transport;

pub use api::ApiClient;
pub use transport::{ConnectionState, Transport};
