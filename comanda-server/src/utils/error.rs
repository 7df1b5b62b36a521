//! 统一错误处理
//!
//! [`AppError`] 是 HTTP 层的错误类型，所有领域错误在这里映射为
//! `shared::error::ErrorCode` 和 HTTP 状态码。
//!
//! # 错误码规范
//!
//! | 前缀 | 分类 | 示例 |
//! |------|------|------|
//! | E0xxx | 通用错误 | E0003 资源不存在 |
//! | E4xxx | 订单错误 | E4006 需要选择骑手 |
//! | E5xxx | 支付/小票错误 | E5102 CPF 无效 |
//! | E9xxx | 系统错误 | E9002 订单存储错误 |
//!
//! # 使用示例
//!
//! ```ignore
//! Err(AppError::not_found(format!("Order {} not found", id)))
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shared::error::ErrorCode;
use shared::response::ApiResponse;
use tracing::error;

use crate::orders::OrderError;
use crate::receipt::ReceiptError;

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== 业务逻辑错误 (4xx) ==========
    #[error("Resource not found: {0}")]
    /// 资源不存在 (404)
    NotFound(String),

    #[error("Validation failed: {0}")]
    /// 验证失败 (400)
    Validation(String),

    #[error("Business rule violation: {1}")]
    /// 业务规则违反 (409 / 422)
    BusinessRule(ErrorCode, String),

    // ========== 系统错误 (5xx) ==========
    #[error("Order store error: {0}")]
    /// 订单存储错误 (500)
    Store(String),

    #[error("Internal server error: {0}")]
    /// 内部错误 (500)
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Validation(_) => ErrorCode::ValidationFailed,
            AppError::BusinessRule(code, _) => *code,
            AppError::Store(_) => ErrorCode::StorageError,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BusinessRule(
                ErrorCode::OrderAlreadyAccepted | ErrorCode::CourierSelectionRequired,
                _,
            ) => StatusCode::CONFLICT,
            AppError::BusinessRule(..) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match &self {
            AppError::NotFound(msg) | AppError::Validation(msg) | AppError::BusinessRule(_, msg) => {
                msg.clone()
            }
            AppError::Store(msg) => {
                error!(target: "store", error = %msg, "Order store error occurred");
                code.message().to_string()
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                code.message().to_string()
            }
        };

        (status, Json(ApiResponse::<()>::error(code, message))).into_response()
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::OrderNotFound(id) => AppError::NotFound(format!("Order {} not found", id)),
            OrderError::RejectionReasonRequired => AppError::Validation(err.to_string()),
            OrderError::Store(e) => AppError::Store(e.to_string()),
            other => AppError::BusinessRule(other.code(), other.to_string()),
        }
    }
}

impl From<ReceiptError> for AppError {
    fn from(err: ReceiptError) -> Self {
        let code = match err {
            ReceiptError::PhoneRequired => ErrorCode::ReceiptPhoneRequired,
            ReceiptError::InvalidCpf(_) => ErrorCode::ReceiptInvalidCpf,
        };
        AppError::BusinessRule(code, err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_errors_map_to_codes() {
        let err: AppError = OrderError::OrderNotFound("o1".into()).into();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: AppError = OrderError::RejectionReasonRequired.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: AppError = OrderError::CourierSelectionRequired {
            order_id: "o1".into(),
            active: 3,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::CourierSelectionRequired);
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_receipt_errors_map_to_codes() {
        let err: AppError = ReceiptError::InvalidCpf("111".into()).into();
        assert_eq!(err.code(), ErrorCode::ReceiptInvalidCpf);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
