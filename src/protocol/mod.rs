//! # RunCam Device Protocol Module
//!
//! Implementation of the RunCam Device (RCDevice) serial protocol.
//!
//! This module handles:
//! - Request frame encoding (header, command, optional parameter, CRC)
//! - CRC8-DVB-S2 checksum calculation and frame verification
//! - Response parsing (device info, 5-key simulation acknowledgements)
//! - Command, operation and response-length tables

pub mod types;
pub mod encoder;
pub mod decoder;
pub mod crc;
