//! Error codes shared by the server and its clients
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Payment / receipt errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Serialized as a plain u16 so non-Rust clients can switch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Transition not allowed from the current status
    InvalidTransition = 4002,
    /// Order was already accepted and printed
    OrderAlreadyAccepted = 4003,
    /// Order is queued until the next opening
    OrderDeferred = 4004,
    /// Order channel does not go through acceptance
    ChannelNotAcceptable = 4005,
    /// Several couriers are active and none was chosen
    CourierSelectionRequired = 4006,
    /// Chosen courier is not active
    CourierNotActive = 4007,
    /// Rejection reason missing
    RejectionReasonRequired = 4008,
    /// Order is not a credit sale / already received
    NotAReceivable = 4009,

    // ==================== 5xxx: Payment / receipt ====================
    /// Payment cannot be confirmed in the current state
    PaymentNotConfirmable = 5001,
    /// Customer phone missing or too short
    ReceiptPhoneRequired = 5101,
    /// CPF failed validation
    ReceiptInvalidCpf = 5102,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Order store failure
    StorageError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Configuration error
    ConfigError = 9005,
    /// Printer unreachable
    PrinterNotAvailable = 9201,
    /// Print job failed
    PrintFailed = 9202,
}

impl ErrorCode {
    /// Numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Default English message
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Success",
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",

            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidTransition => "Transition not allowed from the current status",
            ErrorCode::OrderAlreadyAccepted => "Order has already been accepted",
            ErrorCode::OrderDeferred => "Order is queued until the next opening",
            ErrorCode::ChannelNotAcceptable => "Order channel does not require acceptance",
            ErrorCode::CourierSelectionRequired => "Choose a courier for this delivery",
            ErrorCode::CourierNotActive => "Courier is not active",
            ErrorCode::RejectionReasonRequired => "Rejection reason is required",
            ErrorCode::NotAReceivable => "Order is not an open receivable",

            ErrorCode::PaymentNotConfirmable => "Payment cannot be confirmed",
            ErrorCode::ReceiptPhoneRequired => "Customer phone is required",
            ErrorCode::ReceiptInvalidCpf => "Invalid CPF",

            ErrorCode::InternalError => "Internal error",
            ErrorCode::StorageError => "Order store error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::PrinterNotAvailable => "Printer not available",
            ErrorCode::PrintFailed => "Print failed",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Unknown numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),

            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::InvalidTransition),
            4003 => Ok(ErrorCode::OrderAlreadyAccepted),
            4004 => Ok(ErrorCode::OrderDeferred),
            4005 => Ok(ErrorCode::ChannelNotAcceptable),
            4006 => Ok(ErrorCode::CourierSelectionRequired),
            4007 => Ok(ErrorCode::CourierNotActive),
            4008 => Ok(ErrorCode::RejectionReasonRequired),
            4009 => Ok(ErrorCode::NotAReceivable),

            5001 => Ok(ErrorCode::PaymentNotConfirmable),
            5101 => Ok(ErrorCode::ReceiptPhoneRequired),
            5102 => Ok(ErrorCode::ReceiptInvalidCpf),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::StorageError),
            9003 => Ok(ErrorCode::NetworkError),
            9005 => Ok(ErrorCode::ConfigError),
            9201 => Ok(ErrorCode::PrinterNotAvailable),
            9202 => Ok(ErrorCode::PrintFailed),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::CourierSelectionRequired.code(), 4006);
        assert_eq!(ErrorCode::ReceiptInvalidCpf.code(), 5102);
        assert_eq!(ErrorCode::PrintFailed.code(), 9202);
    }

    #[test]
    fn test_display_is_prefixed() {
        assert_eq!(ErrorCode::Success.to_string(), "E0000");
        assert_eq!(ErrorCode::InvalidTransition.to_string(), "E4002");
    }

    #[test]
    fn test_try_from_roundtrip() {
        for code in [
            ErrorCode::NotFound,
            ErrorCode::OrderDeferred,
            ErrorCode::PaymentNotConfirmable,
            ErrorCode::StorageError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::OrderDeferred).unwrap();
        assert_eq!(json, "4004");
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::OrderDeferred);
    }
}
