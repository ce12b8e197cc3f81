// Shared fixtures for the driver integration tests

#![allow(dead_code)]

use runcam_rcdevice::camera::{CameraSettings, Features, RunCam};
use runcam_rcdevice::controller::{CentredSticks, RcInput, StickMap, SwitchPosition};
use runcam_rcdevice::osd::LoggingOsd;
use runcam_rcdevice::protocol::crc::crc8_dvb_s2;
use runcam_rcdevice::protocol::types::RUNCAM_HEADER;
use runcam_rcdevice::serial::MockTransport;

pub const BOOT_DELAY_MS: u32 = 500;

/// Append the CRC to a response body
pub fn reply(body: &[u8]) -> Vec<u8> {
    let mut frame = body.to_vec();
    frame.push(crc8_dvb_s2(body));
    frame
}

pub fn device_info_reply(version: u8, features: Features) -> Vec<u8> {
    let [lo, hi] = features.bits().to_le_bytes();
    reply(&[RUNCAM_HEADER, version, lo, hi])
}

/// Transport that behaves like a v1.0 camera with the given features
///
/// 5-key requests are only answered when `answer_five_key` is set.
pub fn camera_port(features: Features, answer_five_key: bool) -> MockTransport {
    let info = device_info_reply(0x01, features);
    let mut port = MockTransport::new();
    port.set_responder(move |frame| match frame[1] {
        0x00 => Some(info.clone()),
        0x02 | 0x03 if answer_five_key => Some(reply(&[RUNCAM_HEADER])),
        0x04 if answer_five_key => Some(reply(&[RUNCAM_HEADER, (frame[2] << 4) | 0x01])),
        _ => None,
    });
    port
}

pub fn settings() -> CameraSettings {
    CameraSettings {
        init_attempts: 2,
        init_attempt_interval_ms: 200,
        boot_delay_ms: BOOT_DELAY_MS,
        button_delay_ms: 100,
        stop_recording_at_boot: false,
        ..CameraSettings::default()
    }
}

/// Sticks held at fixed positions, read through the default channel map
#[derive(Debug, Clone, Copy, Default)]
pub struct Sticks {
    pub roll: SwitchPosition,
    pub pitch: SwitchPosition,
    pub throttle: SwitchPosition,
    pub yaw: SwitchPosition,
}

impl RcInput for Sticks {
    fn switch_position(&self, channel: u8) -> SwitchPosition {
        let map = StickMap::default();
        if channel == map.roll {
            self.roll
        } else if channel == map.pitch {
            self.pitch
        } else if channel == map.throttle {
            self.throttle
        } else {
            self.yaw
        }
    }
}

pub fn yaw_right() -> Sticks {
    Sticks {
        yaw: SwitchPosition::High,
        ..Sticks::default()
    }
}

pub fn yaw_left() -> Sticks {
    Sticks {
        yaw: SwitchPosition::Low,
        ..Sticks::default()
    }
}

pub fn pitch_down() -> Sticks {
    Sticks {
        pitch: SwitchPosition::Low,
        ..Sticks::default()
    }
}

/// Negotiate and wait out the boot delay; returns the current time
pub fn boot(camera: &mut RunCam<MockTransport>, osd: &mut LoggingOsd) -> u32 {
    camera.init(0).unwrap();
    camera.update(10, &CentredSticks, false, osd);
    camera.update(BOOT_DELAY_MS, &CentredSticks, false, osd);
    camera.transport_mut().take_written();
    BOOT_DELAY_MS
}
