//! API Response types

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Unified API response structure
///
/// ```json
/// {
///     "code": "E0000",
///     "message": "Success",
///     "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response code (E0000 = success)
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn ok(data: T) -> Self {
        Self {
            code: ErrorCode::Success.to_string(),
            message: ErrorCode::Success.message().to_string(),
            data: Some(data),
        }
    }

    /// Create an error response
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ErrorCode::Success.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_shape() {
        let resp = ApiResponse::ok(vec![1, 2]);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], "E0000");
        assert_eq!(json["data"][1], 2);
        assert!(resp.is_success());
    }

    #[test]
    fn test_error_skips_data() {
        let resp = ApiResponse::<()>::error(ErrorCode::OrderNotFound, "Order o1 not found");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], "E4001");
        assert!(json.get("data").is_none());
        assert!(!resp.is_success());
    }
}
