//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::camera::driver::CameraSettings;
use crate::camera::profile::{FeatureOverride, Features};
use crate::controller::StickMap;
use crate::error::{Result, RunCamError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub rc: StickMap,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Camera driver configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// Feature bits assumed present whatever the camera reports
    #[serde(default)]
    pub force_features: u16,

    /// Feature bits ignored even if the camera reports them
    #[serde(default)]
    pub withhold_features: u16,

    #[serde(default = "default_init_attempts")]
    pub init_attempts: u16,

    #[serde(default = "default_init_attempt_interval_ms")]
    pub init_attempt_interval_ms: u32,

    #[serde(default = "default_boot_delay_ms")]
    pub boot_delay_ms: u32,

    #[serde(default = "default_button_delay_ms")]
    pub button_delay_ms: u32,

    #[serde(default = "default_update_rate_hz")]
    pub update_rate_hz: u32,

    #[serde(default = "default_true")]
    pub record_on_arm: bool,

    #[serde(default = "default_true")]
    pub stop_recording_at_boot: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            force_features: 0,
            withhold_features: 0,
            init_attempts: default_init_attempts(),
            init_attempt_interval_ms: default_init_attempt_interval_ms(),
            boot_delay_ms: default_boot_delay_ms(),
            button_delay_ms: default_button_delay_ms(),
            update_rate_hz: default_update_rate_hz(),
            record_on_arm: true,
            stop_recording_at_boot: true,
        }
    }
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { crate::serial::RUNCAM_BAUD_RATE }

fn default_init_attempts() -> u16 { 4 }
fn default_init_attempt_interval_ms() -> u32 { 5000 }
fn default_boot_delay_ms() -> u32 { 7000 }
fn default_button_delay_ms() -> u32 { 300 }
fn default_update_rate_hz() -> u32 { 50 }
fn default_true() -> bool { true }

fn invalid(message: impl std::fmt::Display) -> RunCamError {
    RunCamError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use runcam_rcdevice::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if ![9600, 19200, 38400, 57600, 115200].contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200",
            ));
        }

        let camera = &self.camera;
        if camera.init_attempts == 0 || camera.init_attempts > 20 {
            return Err(invalid("init_attempts must be between 1 and 20"));
        }

        if camera.init_attempt_interval_ms == 0 || camera.init_attempt_interval_ms > 60000 {
            return Err(invalid("init_attempt_interval_ms must be between 1 and 60000"));
        }

        if camera.boot_delay_ms > 60000 {
            return Err(invalid("boot_delay_ms must be between 0 and 60000"));
        }

        if camera.button_delay_ms == 0 || camera.button_delay_ms > 10000 {
            return Err(invalid("button_delay_ms must be between 1 and 10000"));
        }

        if camera.update_rate_hz == 0 || camera.update_rate_hz > 500 {
            return Err(invalid("update_rate_hz must be between 1 and 500"));
        }

        // RC channels are 1-based, 16 of them
        let channels = self.rc.channels();
        for (name, channel) in ["roll", "pitch", "throttle", "yaw"].iter().zip(channels) {
            if channel == 0 || channel > 16 {
                return Err(invalid(format!(
                    "rc.{} channel {} is out of bounds (must be 1-16)",
                    name, channel
                )));
            }
        }

        for (i, channel) in channels.iter().enumerate() {
            if channels[i + 1..].contains(channel) {
                return Err(invalid(format!(
                    "rc channel {} is mapped to more than one stick",
                    channel
                )));
            }
        }

        Ok(())
    }

    /// Driver settings derived from this configuration
    pub fn camera_settings(&self) -> CameraSettings {
        CameraSettings {
            overrides: FeatureOverride {
                force: Features::from_bits_truncate(self.camera.force_features),
                withhold: Features::from_bits_truncate(self.camera.withhold_features),
            },
            init_attempts: self.camera.init_attempts,
            init_attempt_interval_ms: self.camera.init_attempt_interval_ms,
            boot_delay_ms: self.camera.boot_delay_ms,
            button_delay_ms: self.camera.button_delay_ms,
            record_on_arm: self.camera.record_on_arm,
            stop_recording_at_boot: self.camera.stop_recording_at_boot,
            sticks: self.rc,
        }
    }
}
