//! Order domain model
//!
//! - **types**: `Order`, `OrderItem`, status enums and the partial-update `OrderPatch`
//! - **command**: lifecycle commands sent by operators and their responses

pub mod command;
pub mod types;

// Re-exports
pub use command::{
    CommandResponse, CommandWarning, OrderCommand, OrderCommandPayload, OrderEdit, WarningKind,
};
pub use types::*;
