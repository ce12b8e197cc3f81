//! # RC Input
//!
//! The driver never sees raw channel values. It asks an [`RcInput`] for the
//! three-way position of a channel, the way a flight controller reports
//! stick gestures.

use serde::{Deserialize, Serialize};

/// PWM below this reads as [`SwitchPosition::Low`] (µs)
pub const PWM_LOW_THRESHOLD: u16 = 1200;
/// PWM above this reads as [`SwitchPosition::High`] (µs)
pub const PWM_HIGH_THRESHOLD: u16 = 1800;

/// Three-way position of a stick or switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchPosition {
    Low,
    #[default]
    Middle,
    High,
}

impl SwitchPosition {
    /// Classify a PWM pulse width in microseconds
    ///
    /// # Examples
    ///
    /// ```
    /// use runcam_rcdevice::controller::SwitchPosition;
    ///
    /// assert_eq!(SwitchPosition::from_pwm(1000), SwitchPosition::Low);
    /// assert_eq!(SwitchPosition::from_pwm(1500), SwitchPosition::Middle);
    /// assert_eq!(SwitchPosition::from_pwm(2000), SwitchPosition::High);
    /// ```
    pub fn from_pwm(pwm: u16) -> Self {
        if pwm < PWM_LOW_THRESHOLD {
            SwitchPosition::Low
        } else if pwm > PWM_HIGH_THRESHOLD {
            SwitchPosition::High
        } else {
            SwitchPosition::Middle
        }
    }
}

/// Source of RC channel positions
#[cfg_attr(test, mockall::automock)]
pub trait RcInput {
    /// Current position of a 1-based RC channel
    fn switch_position(&self, channel: u8) -> SwitchPosition;
}

/// RC input with every channel centred
#[derive(Debug, Clone, Copy, Default)]
pub struct CentredSticks;

impl RcInput for CentredSticks {
    fn switch_position(&self, _channel: u8) -> SwitchPosition {
        SwitchPosition::Middle
    }
}

/// Which RC channels carry the four primary sticks (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickMap {
    #[serde(default = "default_roll")]
    pub roll: u8,
    #[serde(default = "default_pitch")]
    pub pitch: u8,
    #[serde(default = "default_throttle")]
    pub throttle: u8,
    #[serde(default = "default_yaw")]
    pub yaw: u8,
}

fn default_roll() -> u8 {
    1
}

fn default_pitch() -> u8 {
    2
}

fn default_throttle() -> u8 {
    3
}

fn default_yaw() -> u8 {
    4
}

impl Default for StickMap {
    fn default() -> Self {
        Self {
            roll: default_roll(),
            pitch: default_pitch(),
            throttle: default_throttle(),
            yaw: default_yaw(),
        }
    }
}

impl StickMap {
    pub fn channels(&self) -> [u8; 4] {
        [self.roll, self.pitch, self.throttle, self.yaw]
    }
}

/// Positions of the four sticks sampled in one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sticks {
    pub roll: SwitchPosition,
    pub pitch: SwitchPosition,
    pub throttle: SwitchPosition,
    pub yaw: SwitchPosition,
}

impl Sticks {
    pub fn read(rc: &dyn RcInput, map: &StickMap) -> Self {
        Self {
            roll: rc.switch_position(map.roll),
            pitch: rc.switch_position(map.pitch),
            throttle: rc.switch_position(map.throttle),
            yaw: rc.switch_position(map.yaw),
        }
    }

    /// Roll, pitch and yaw all back in the middle; throttle is not checked
    pub fn centred(&self) -> bool {
        self.roll == SwitchPosition::Middle
            && self.pitch == SwitchPosition::Middle
            && self.yaw == SwitchPosition::Middle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pwm_thresholds() {
        assert_eq!(SwitchPosition::from_pwm(0), SwitchPosition::Low);
        assert_eq!(SwitchPosition::from_pwm(1199), SwitchPosition::Low);
        assert_eq!(SwitchPosition::from_pwm(1200), SwitchPosition::Middle);
        assert_eq!(SwitchPosition::from_pwm(1800), SwitchPosition::Middle);
        assert_eq!(SwitchPosition::from_pwm(1801), SwitchPosition::High);
    }

    #[test]
    fn test_default_stick_map() {
        assert_eq!(StickMap::default().channels(), [1, 2, 3, 4]);
    }

    #[test]
    fn test_sticks_read_through_map() {
        let map = StickMap {
            roll: 4,
            pitch: 3,
            throttle: 2,
            yaw: 1,
        };
        let mut rc = MockRcInput::new();
        rc.expect_switch_position().returning(|channel| match channel {
            1 => SwitchPosition::High,
            4 => SwitchPosition::Low,
            _ => SwitchPosition::Middle,
        });

        let sticks = Sticks::read(&rc, &map);
        assert_eq!(sticks.yaw, SwitchPosition::High);
        assert_eq!(sticks.roll, SwitchPosition::Low);
        assert_eq!(sticks.pitch, SwitchPosition::Middle);
        assert!(!sticks.centred());
    }

    #[test]
    fn test_centred_ignores_throttle() {
        let sticks = Sticks {
            throttle: SwitchPosition::Low,
            ..Sticks::default()
        };
        assert!(sticks.centred());
        assert!(Sticks::read(&CentredSticks, &StickMap::default()).centred());
    }
}
