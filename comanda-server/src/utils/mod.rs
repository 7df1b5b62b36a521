//! 工具模块 - 通用工具函数和类型
//!
//! - [`AppError`] - HTTP 层错误类型
//! - 日志、时区工具

pub mod error;
pub mod logger;
pub mod time;

pub use error::{AppError, AppResult, ok};
