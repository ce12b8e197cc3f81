//! Negotiated facts about the attached camera.

use bitflags::bitflags;
use tracing::{info, warn};

use crate::error::{Result, RunCamError};
use crate::protocol::decoder::DeviceInfo;
use crate::protocol::types::ProtocolVersion;

bitflags! {
    /// Capabilities reported by (or assumed for) the camera.
    ///
    /// The bit layout is the one used on the wire in the device-info response.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Features: u16 {
        const SIMULATE_POWER_BUTTON    = 1 << 0;
        /// The Wi-Fi button doubles as the mode button
        const SIMULATE_MODE_BUTTON     = 1 << 1;
        const CHANGE_MODE              = 1 << 2;
        const SIMULATE_5_KEY_OSD_CABLE = 1 << 3;
        const DEVICE_SETTINGS_ACCESS   = 1 << 4;
        const DISPLAY_PORT             = 1 << 5;
        const START_RECORDING          = 1 << 6;
        const STOP_RECORDING           = 1 << 7;
    }
}

/// Host-side adjustments to the negotiated feature set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureOverride {
    /// Flags assumed present whatever the camera says
    pub force: Features,
    /// Flags ignored even if the camera reports them
    pub withhold: Features,
}

impl FeatureOverride {
    pub fn apply(&self, reported: Features) -> Features {
        (reported | self.force) - self.withhold
    }
}

/// What the driver knows about the camera
///
/// Empty until a device-info exchange succeeds; fixed from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceProfile {
    protocol_version: ProtocolVersion,
    features: Features,
    negotiated: bool,
}

impl DeviceProfile {
    /// Fill the profile from a device-info response
    ///
    /// Only protocol v1.0 is accepted. Any other version leaves the feature
    /// set empty and the profile un-negotiated; the version is still recorded
    /// so the failure can be reported.
    ///
    /// # Errors
    ///
    /// Returns [`RunCamError::UnsupportedProtocolVersion`] for legacy or
    /// unknown versions.
    pub fn negotiate(&mut self, info: &DeviceInfo, overrides: &FeatureOverride) -> Result<()> {
        if self.negotiated {
            return Ok(());
        }

        self.protocol_version = info.protocol_version;
        if info.protocol_version != ProtocolVersion::V1_0 {
            warn!(
                "RunCam reports unsupported protocol version 0x{:02X} ({:?})",
                info.raw_version, info.protocol_version
            );
            return Err(RunCamError::UnsupportedProtocolVersion(info.raw_version));
        }

        let reported = Features::from_bits_truncate(info.features);
        self.features = overrides.apply(reported);
        self.negotiated = true;

        info!(
            "RunCam device initialized, features 0x{:04X} (reported 0x{:04X})",
            self.features.bits(),
            info.features
        );
        Ok(())
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn is_negotiated(&self) -> bool {
        self.negotiated
    }

    pub fn has(&self, feature: Features) -> bool {
        self.features.contains(feature)
    }

    /// Fail with [`RunCamError::CapabilityAbsent`] unless every flag in `feature` is present
    pub fn require(&self, feature: Features) -> Result<()> {
        if self.has(feature) {
            Ok(())
        } else {
            Err(RunCamError::CapabilityAbsent(feature))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(version: u8, features: u16) -> DeviceInfo {
        DeviceInfo {
            protocol_version: ProtocolVersion::from_u8(version),
            raw_version: version,
            features,
        }
    }

    #[test]
    fn test_profile_starts_empty() {
        let profile = DeviceProfile::default();
        assert!(!profile.is_negotiated());
        assert_eq!(profile.protocol_version(), ProtocolVersion::Unknown);
        assert!(profile.features().is_empty());
    }

    #[test]
    fn test_negotiate_v1() {
        let mut profile = DeviceProfile::default();
        profile
            .negotiate(&info(0x01, 0x00C0), &FeatureOverride::default())
            .unwrap();

        assert!(profile.is_negotiated());
        assert_eq!(profile.protocol_version(), ProtocolVersion::V1_0);
        assert_eq!(
            profile.features(),
            Features::START_RECORDING | Features::STOP_RECORDING
        );
    }

    #[test]
    fn test_negotiate_legacy_is_rejected() {
        let mut profile = DeviceProfile::default();
        let result = profile.negotiate(&info(0x00, 0x00FF), &FeatureOverride::default());

        assert!(matches!(result, Err(RunCamError::UnsupportedProtocolVersion(0x00))));
        assert!(!profile.is_negotiated());
        assert_eq!(profile.protocol_version(), ProtocolVersion::Legacy);
        assert!(profile.features().is_empty());
    }

    #[test]
    fn test_unknown_feature_bits_are_dropped() {
        let mut profile = DeviceProfile::default();
        profile
            .negotiate(&info(0x01, 0xFF01), &FeatureOverride::default())
            .unwrap();
        assert_eq!(profile.features(), Features::SIMULATE_POWER_BUTTON);
    }

    #[test]
    fn test_overrides() {
        let overrides = FeatureOverride {
            force: Features::SIMULATE_5_KEY_OSD_CABLE,
            withhold: Features::START_RECORDING,
        };
        let mut profile = DeviceProfile::default();
        profile.negotiate(&info(0x01, 0x00C0), &overrides).unwrap();

        assert!(profile.has(Features::SIMULATE_5_KEY_OSD_CABLE));
        assert!(!profile.has(Features::START_RECORDING));
        assert!(profile.has(Features::STOP_RECORDING));
    }

    #[test]
    fn test_profile_is_immutable_once_negotiated() {
        let mut profile = DeviceProfile::default();
        profile
            .negotiate(&info(0x01, 0x0040), &FeatureOverride::default())
            .unwrap();
        profile
            .negotiate(&info(0x01, 0x0008), &FeatureOverride::default())
            .unwrap();
        assert_eq!(profile.features(), Features::START_RECORDING);
    }

    #[test]
    fn test_require() {
        let mut profile = DeviceProfile::default();
        profile
            .negotiate(&info(0x01, 0x0003), &FeatureOverride::default())
            .unwrap();

        assert!(profile
            .require(Features::SIMULATE_POWER_BUTTON | Features::SIMULATE_MODE_BUTTON)
            .is_ok());
        assert!(matches!(
            profile.require(Features::START_RECORDING),
            Err(RunCamError::CapabilityAbsent(f)) if f == Features::START_RECORDING
        ));
    }
}
