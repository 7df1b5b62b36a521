//! Order lifecycle module
//!
//! - **channel**: intake channel classification from provenance tags
//! - **tabs**: operator tab membership and the "All" filter
//! - **board**: board views (tab + search + counts)
//! - **actions**: one handler per lifecycle command
//! - **manager**: OrdersManager, command processing and side effects
//! - **outbox**: recorded side-effect tasks, retryable
//! - **refresh**: change feed and coalesced board refresh
//!
//! # Architecture
//!
//! ```text
//! Command → OrdersManager → Action (validate + plan) → OrderStore
//!                 ↓                                        ↓
//!              Outbox (stock, receipt)              OrderChange feed
//!                                                          ↓
//!                                                  Board refresh (SSE)
//! ```

pub mod actions;
pub mod board;
pub mod channel;
pub mod manager;
pub mod outbox;
pub mod refresh;
pub mod tabs;
pub mod traits;

// Re-exports
pub use board::{BoardEntry, BoardView, OrderBoard};
pub use channel::{ChannelClassifier, ChannelRules, OrderChannel};
pub use manager::OrdersManager;
pub use outbox::{Outbox, OutboxTask, ReceiptReason, TaskKind, TaskStatus};
pub use refresh::{ChangeFeed, ChangeKind, OrderChange, RefreshSignal, RefreshThrottle};
pub use tabs::{DeploymentMode, OrderTab, TabTable};
pub use traits::{CommandContext, CommandHandler, CommandMetadata, OrderError, Transition};

// Re-export shared types for convenience
pub use shared::order::{
    CommandResponse, CommandWarning, Order, OrderCommand, OrderCommandPayload, OrderStatus,
};
