//! Shared types for the Comanda platform
//!
//! Domain types used by the server, its HTTP surface and the clients:
//! orders and their items, lifecycle commands, couriers, store header
//! data, error codes and the response envelope.

pub mod error;
pub mod models;
pub mod order;
pub mod response;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::ErrorCode;
pub use models::{Courier, StoreInfo};
pub use order::{
    CommandResponse, CommandWarning, Order, OrderCommand, OrderCommandPayload, OrderEdit,
    OrderItem, OrderPatch, OrderStatus, OrderType, PaymentStatus,
};
pub use response::ApiResponse;
