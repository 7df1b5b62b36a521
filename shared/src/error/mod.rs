//! Error codes shared across the workspace
//!
//! Ranges:
//!
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Payment / receipt errors
//! - 9xxx: System errors

mod codes;

pub use codes::{ErrorCode, InvalidErrorCode};
