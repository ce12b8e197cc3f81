//! On-screen display collaborator.
//!
//! The flight controller's OSD overlay is hidden while the camera menu is
//! shown, so the two do not draw over each other.

use tracing::info;

#[cfg_attr(test, mockall::automock)]
pub trait OsdControl {
    fn enable(&mut self);
    fn disable(&mut self);
}

/// OSD stand-in that only logs, used by the binary
#[derive(Debug)]
pub struct LoggingOsd {
    enabled: bool,
}

impl LoggingOsd {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for LoggingOsd {
    fn default() -> Self {
        Self::new()
    }
}

impl OsdControl for LoggingOsd {
    fn enable(&mut self) {
        if !self.enabled {
            info!("OSD enabled");
        }
        self.enabled = true;
    }

    fn disable(&mut self) {
        if self.enabled {
            info!("OSD disabled");
        }
        self.enabled = false;
    }
}
