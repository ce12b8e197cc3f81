//! # RunCam RCDevice Library
//!
//! Drive a RunCam FPV camera over its serial Device Protocol.
//!
//! This library provides a poll-driven driver for feature discovery,
//! recording start/stop and OSD menu navigation by simulated button presses.
//! The host calls [`camera::RunCam::update`] from its control loop and supplies
//! RC input, the arming state and an OSD handle on every tick.

pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod osd;
pub mod protocol;
pub mod serial;
