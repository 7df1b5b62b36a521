//! Data models
//!
//! Shared between the server and its clients (via API).

pub mod courier;
pub mod store_info;

// Re-exports
pub use courier::*;
pub use store_info::*;
