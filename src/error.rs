//! # Error Types
//!
//! Custom error types for the RunCam driver using `thiserror`.
//!
//! Irrelevant events (an RC gesture that means nothing in the current state)
//! are not errors: the state machine drops them and carries on.

use thiserror::Error;

use crate::camera::profile::Features;
use crate::protocol::types::Command;

/// Main error type for the RunCam driver
#[derive(Debug, Error)]
pub enum RunCamError {
    /// A response arrived complete but its CRC did not match
    #[error("Bad CRC in response to {command:?}")]
    ProtocolFraming { command: Command },

    /// No (or an incomplete) response arrived before the deadline
    #[error("Timed out waiting for response to {command:?}")]
    Timeout { command: Command },

    /// The request failed on every attempt it was allowed
    #[error("{command:?} failed after {attempts} attempts")]
    RetryExhausted { command: Command, attempts: u16 },

    /// The negotiated feature set does not include what the operation needs
    #[error("Camera does not support {0:?}")]
    CapabilityAbsent(Features),

    /// Another request is still waiting for its response
    #[error("Cannot send {requested:?}: {pending:?} is still pending")]
    RequestPending { requested: Command, pending: Command },

    /// The camera speaks a protocol version this driver does not implement
    #[error("Unsupported RunCam protocol version 0x{0:02X}")]
    UnsupportedProtocolVersion(u8),

    /// A response was well-formed but carried a payload we cannot use
    #[error("Malformed response to {command:?}: {reason}")]
    MalformedResponse { command: Command, reason: String },

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reason the driver is currently blocking arming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PreArmFailure {
    /// Capability negotiation has not completed
    #[error("Camera not ready")]
    CameraNotReady,

    /// A menu navigation sequence is in progress
    #[error("In OSD menu")]
    InMenu,
}

/// Result type alias for the RunCam driver
pub type Result<T> = std::result::Result<T, RunCamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_arm_messages() {
        assert_eq!(PreArmFailure::CameraNotReady.to_string(), "Camera not ready");
        assert_eq!(PreArmFailure::InMenu.to_string(), "In OSD menu");
    }

    #[test]
    fn test_retry_exhausted_display() {
        let err = RunCamError::RetryExhausted {
            command: Command::FiveKeyConnection,
            attempts: 3,
        };
        assert_eq!(err.to_string(), "FiveKeyConnection failed after 3 attempts");
    }

    #[test]
    fn test_unsupported_version_display() {
        let err = RunCamError::UnsupportedProtocolVersion(0x00);
        assert_eq!(err.to_string(), "Unsupported RunCam protocol version 0x00");
    }
}
