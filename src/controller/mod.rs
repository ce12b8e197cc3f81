//! # Controller Module
//!
//! RC stick input for the camera driver.
//!
//! This module handles:
//! - Reading stick positions from an [`RcInput`] through a configurable channel map
//! - Turning stick gestures and arming edges into driver [`Event`](crate::camera::state::Event)s

pub mod mapper;
pub mod rc_input;

pub use mapper::{EventMapper, MapperContext};
pub use rc_input::{CentredSticks, RcInput, StickMap, Sticks, SwitchPosition};
