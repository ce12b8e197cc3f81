//! # RunCam Protocol Constants and Types
//!
//! Core protocol definitions for the RunCam Device Protocol.

/// Frame header byte, first byte of every request and response
pub const RUNCAM_HEADER: u8 = 0xCC;

/// Largest frame either side will ever send
pub const RUNCAM_MAX_PACKET_SIZE: usize = 64;

/// Settle time after a press that makes the camera change mode (ms)
pub const RUNCAM_MODE_DELAY_MS: u32 = 600;

/// Timeout for each 5-key OSD cable request (ms)
pub const FIVE_KEY_TIMEOUT_MS: u32 = 400;

/// Retries allowed for each 5-key OSD cable request
pub const FIVE_KEY_MAX_RETRIES: u16 = 2;

/// Protocol commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    GetDeviceInfo = 0x00,
    CameraControl = 0x01,
    FiveKeySimulationPress = 0x02,
    FiveKeySimulationRelease = 0x03,
    FiveKeyConnection = 0x04,
}

impl Command {
    /// Total length of the camera's response, header and CRC included
    ///
    /// Zero means the camera never answers this command.
    pub const fn response_length(self) -> usize {
        match self {
            Command::GetDeviceInfo => 5,
            Command::CameraControl => 0,
            Command::FiveKeySimulationPress => 2,
            Command::FiveKeySimulationRelease => 2,
            Command::FiveKeyConnection => 3,
        }
    }

    /// Whether the request frame carries the parameter byte
    pub const fn takes_param(self) -> bool {
        matches!(
            self,
            Command::CameraControl | Command::FiveKeySimulationPress | Command::FiveKeyConnection
        )
    }
}

/// Camera-control operations (button simulation and recording)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlOperation {
    /// The Wi-Fi/mode button
    SimulateModeButton = 0x00,
    SimulatePowerButton = 0x01,
    ChangeMode = 0x02,
    StartRecording = 0x03,
    StopRecording = 0x04,
}

/// Operations of the 5-key connection command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionOperation {
    Open = 0x01,
    Close = 0x02,
}

impl ConnectionOperation {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(ConnectionOperation::Open),
            0x02 => Some(ConnectionOperation::Close),
            _ => None,
        }
    }
}

/// Keys of the simulated 5-way joystick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SimulationOperation {
    Set = 0x01,
    Left = 0x02,
    Right = 0x03,
    Up = 0x04,
    Down = 0x05,
}

/// Protocol version reported in the device-info response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolVersion {
    /// RCSplit firmware <= 1.1.0, not supported
    Legacy,
    V1_0,
    #[default]
    Unknown,
}

impl ProtocolVersion {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => ProtocolVersion::Legacy,
            0x01 => ProtocolVersion::V1_0,
            _ => ProtocolVersion::Unknown,
        }
    }
}
