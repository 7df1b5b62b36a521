//! Receipt reconstruction
//!
//! Notes parser (tokenizer → strategies → cleanup), order-level
//! instructions, canonical receipt composition and ESC/POS rendering.

pub mod cleanup;
pub mod composer;
pub mod instructions;
pub mod keywords;
pub mod money;
pub mod renderer;
pub mod strategies;
pub mod tokenizer;

pub use composer::{NonFiscalReceipt, ReceiptComposer, ReceiptDocument, ReceiptError};
pub use renderer::ReceiptRenderer;
pub use strategies::{ParseStrategy, ParsedItem, ParsedReceipt, parse_order_items};
