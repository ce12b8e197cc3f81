//! # Camera Module
//!
//! The RunCam device driver and the state it keeps about the camera.
//!
//! This module handles:
//! - The single in-flight request with its retries and timeout
//! - Capability negotiation at boot
//! - The control state machine (ready, recording, menu)
//! - OSD menu navigation with the 2-key or 5-key strategy

pub mod driver;
pub mod menu;
pub mod profile;
pub mod request;
pub mod state;

pub use driver::{CameraSettings, RunCam};
pub use menu::{MenuCursor, MenuStrategy};
pub use profile::{DeviceProfile, FeatureOverride, Features};
pub use request::{RequestManager, RequestStatus};
pub use state::{ControlState, Event};
