//! # RunCam Response Decoder
//!
//! Parsers for the response frames the camera sends back. Each parser takes a
//! complete frame (header and CRC included) whose checksum has already been
//! verified, and turns it into a [`Response`].

use super::types::*;
use crate::error::{Result, RunCamError};

/// Decoded camera response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Answer to `GetDeviceInfo`
    DeviceInfo(DeviceInfo),

    /// Acknowledgement of a 5-key press or release
    KeyAck,

    /// Answer to a 5-key connection open/close
    Connection(ConnectionResult),
}

/// Raw device information as reported by the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub protocol_version: ProtocolVersion,

    /// Version byte exactly as received
    pub raw_version: u8,

    /// Feature bitmask, little-endian on the wire
    pub features: u16,
}

/// Outcome of a 5-key connection request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionResult {
    /// Operation echoed in the high nibble
    pub operation: Option<ConnectionOperation>,

    /// Result code in the low nibble equals 1
    pub success: bool,
}

/// Function that interprets one response shape
pub type ResponseParser = fn(&[u8]) -> Result<Response>;

fn check_length(command: Command, frame: &[u8]) -> Result<()> {
    let expected = command.response_length();
    if frame.len() < expected {
        return Err(RunCamError::MalformedResponse {
            command,
            reason: format!("expected {} bytes, got {}", expected, frame.len()),
        });
    }
    if frame.first() != Some(&RUNCAM_HEADER) {
        return Err(RunCamError::MalformedResponse {
            command,
            reason: format!("invalid header byte: 0x{:02X}", frame[0]),
        });
    }
    Ok(())
}

/// Parse a device-info response: `header, version, features_lo, features_hi, crc`
pub fn parse_device_info(frame: &[u8]) -> Result<Response> {
    check_length(Command::GetDeviceInfo, frame)?;

    Ok(Response::DeviceInfo(DeviceInfo {
        protocol_version: ProtocolVersion::from_u8(frame[1]),
        raw_version: frame[1],
        features: u16::from_le_bytes([frame[2], frame[3]]),
    }))
}

/// Parse a 5-key press or release acknowledgement: `header, crc`
pub fn parse_key_ack(frame: &[u8]) -> Result<Response> {
    check_length(Command::FiveKeySimulationPress, frame)?;
    Ok(Response::KeyAck)
}

/// Parse a 5-key connection response: `header, (op << 4) | result, crc`
pub fn parse_connection(frame: &[u8]) -> Result<Response> {
    check_length(Command::FiveKeyConnection, frame)?;

    let status = frame[1];
    Ok(Response::Connection(ConnectionResult {
        operation: ConnectionOperation::from_u8(status >> 4),
        success: status & 0x0F == 1,
    }))
}
