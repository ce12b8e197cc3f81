//! # RunCam Packet Encoder
//!
//! Builds request frames and verifies the checksum of received frames.

use super::crc::crc8_dvb_s2;
use super::types::*;

/// Encode a request into a complete RunCam frame
///
/// The frame is `header, command, [param], crc`. The parameter byte is only
/// emitted for commands that take one (see [`Command::takes_param`]); it is
/// ignored otherwise.
///
/// # Examples
///
/// ```
/// use runcam_rcdevice::protocol::encoder::{encode_request, verify_frame};
/// use runcam_rcdevice::protocol::types::{Command, ControlOperation};
///
/// let frame = encode_request(Command::CameraControl, ControlOperation::StartRecording as u8);
/// assert_eq!(&frame[..3], &[0xCC, 0x01, 0x03]);
/// assert!(verify_frame(&frame));
/// ```
pub fn encode_request(command: Command, param: u8) -> Vec<u8> {
    let mut frame = Vec::with_capacity(4);
    frame.push(RUNCAM_HEADER);
    frame.push(command as u8);
    if command.takes_param() {
        frame.push(param);
    }

    let crc = crc8_dvb_s2(&frame);
    frame.push(crc);

    frame
}

/// Check the trailing CRC of a complete frame
///
/// Recomputes the checksum over everything but the last byte and compares it
/// with the last byte. Frames shorter than two bytes never verify.
pub fn verify_frame(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((&crc, body)) if !body.is_empty() => crc8_dvb_s2(body) == crc,
        _ => false,
    }
}
