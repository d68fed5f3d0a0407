//! TWAI Driver Error Types

use thiserror::Error;

/// Status codes returned by the controller primitives
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Fail = -1,
    NoMem = 0x101,
    InvalidArg = 0x102,
    InvalidState = 0x103,
    NotSupported = 0x106,
    Timeout = 0x107,
    Unknown = -99,
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        match code {
            -1 => Self::Fail,
            0x101 => Self::NoMem,
            0x102 => Self::InvalidArg,
            0x103 => Self::InvalidState,
            0x106 => Self::NotSupported,
            0x107 => Self::Timeout,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fail => "ESP_FAIL",
            Self::NoMem => "ESP_ERR_NO_MEM",
            Self::InvalidArg => "ESP_ERR_INVALID_ARG",
            Self::InvalidState => "ESP_ERR_INVALID_STATE",
            Self::NotSupported => "ESP_ERR_NOT_SUPPORTED",
            Self::Timeout => "ESP_ERR_TIMEOUT",
            Self::Unknown => "unknown",
        };
        write!(f, "{} ({})", name, *self as i32)
    }
}

/// Errors that can occur while bringing the controller up
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// RX or TX pin is unset
    #[error("Invalid GPIO pins: rx={rx}, tx={tx}")]
    InvalidPins { rx: i8, tx: i8 },

    /// Driver install rejected; nothing was allocated
    #[error("Failed to install TWAI driver: {0}")]
    Install(ErrorCode),

    /// Driver installed but refused to start; it was uninstalled again
    #[error("Failed to start TWAI driver: {0}")]
    Start(ErrorCode),
}

impl DriverError {
    /// Whether the failure happened before any hardware was touched
    pub fn is_config_error(&self) -> bool {
        matches!(self, DriverError::InvalidPins { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_conversion() {
        assert_eq!(ErrorCode::from(0x103), ErrorCode::InvalidState);
        assert_eq!(ErrorCode::from(-1), ErrorCode::Fail);
        assert_eq!(ErrorCode::from(12345), ErrorCode::Unknown);
    }

    #[test]
    fn test_error_display() {
        let err = DriverError::Install(ErrorCode::NoMem);
        assert_eq!(
            err.to_string(),
            "Failed to install TWAI driver: ESP_ERR_NO_MEM (257)"
        );
        assert!(DriverError::InvalidPins { rx: -1, tx: 5 }.is_config_error());
        assert!(!err.is_config_error());
    }
}
