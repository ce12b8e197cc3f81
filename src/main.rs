//! # RunCam RCDevice
//!
//! Drive a RunCam camera over its serial Device Protocol.
//!
//! The binary opens the camera link, negotiates its features and then polls
//! the driver at a fixed rate with centred sticks and a disarmed vehicle,
//! which is enough to bring a camera up, stop any boot-time recording and
//! watch it over the logs.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use runcam_rcdevice::camera::{ControlState, RunCam};
use runcam_rcdevice::config::Config;
use runcam_rcdevice::controller::CentredSticks;
use runcam_rcdevice::osd::LoggingOsd;
use runcam_rcdevice::serial::SerialTransport;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Seconds between status log lines
const STATUS_INTERVAL_S: u32 = 10;

/// Poll period for an update rate, never below 1 ms
fn poll_period_ms(update_rate_hz: u32) -> u64 {
    u64::from((1000 / update_rate_hz.max(1)).max(1))
}

/// Load the configuration, falling back to defaults if the file is absent
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path).with_context(|| format!("Failed to load {}", path.display()))
    } else {
        warn!("{} not found, using default configuration", path.display());
        Ok(Config::default())
    }
}

/// Main entry point
///
/// 1. Set up logging (non-blocking stdout, `RUST_LOG` honoured)
/// 2. Load configuration and open the camera's serial port
/// 3. Start capability negotiation and poll the driver until Ctrl+C
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO runcam_rcdevice: RunCam RCDevice v0.1.0 starting...
/// INFO runcam_rcdevice::serial: Opened RunCam link at /dev/ttyUSB0 (115200 baud)
/// INFO runcam_rcdevice::camera::profile: RunCam device initialized, features 0x00C7 (reported 0x00C7)
/// INFO runcam_rcdevice::camera::driver: RunCam state Initialized -> Ready
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(writer)
        .init();

    info!("RunCam RCDevice v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = load_config(&config_path)?;

    let transport = SerialTransport::open(&config.serial.port, config.serial.baud_rate)?;
    let mut camera = RunCam::new(transport, config.camera_settings());
    let mut osd = LoggingOsd::new();

    let start = Instant::now();
    let now_ms = || start.elapsed().as_millis() as u32;

    camera.init(now_ms())?;

    let rate_hz = config.camera.update_rate_hz;
    let mut ticker = interval(Duration::from_millis(poll_period_ms(rate_hz)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Polling camera at {}Hz", rate_hz);
    info!("Press Ctrl+C to exit");

    let mut last_state = camera.state();
    let mut last_status_ms = 0u32;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = now_ms();
                camera.update(now, &CentredSticks, false, &mut osd);

                if camera.state() != last_state {
                    last_state = camera.state();
                    if last_state == ControlState::Ready {
                        info!(
                            "Camera ready (features 0x{:04X})",
                            camera.profile().features().bits()
                        );
                    }
                }

                if now.wrapping_sub(last_status_ms) >= STATUS_INTERVAL_S * 1000 {
                    last_status_ms = now;
                    match camera.pre_arm_check() {
                        Ok(()) => info!("Camera {:?}, ready to arm", last_state),
                        Err(reason) => info!("Camera {:?}, arming blocked: {}", last_state, reason),
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    Ok(())
}
