//! Host feature flags consulted by step applicability predicates

use crate::system::SystemInteraction;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Package only present on the downstream (vendor) build of the product
const DOWNSTREAM_PACKAGE: &str = "satellite";

/// What kind of host the tool is running on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFeatures {
    /// Downstream (vendor) build of the product is installed
    pub downstream: bool,

    /// The server product itself is installed
    pub server: bool,

    /// systemd manages services on this host
    pub systemd: bool,
}

/// Optional per-flag overrides from the configuration file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureOverrides {
    #[serde(default)]
    pub downstream: Option<bool>,

    #[serde(default)]
    pub server: Option<bool>,

    #[serde(default)]
    pub systemd: Option<bool>,
}

impl HostFeatures {
    /// Probe the host
    ///
    /// A probe that cannot run counts as the feature being absent.
    pub fn detect(system: &dyn SystemInteraction) -> Self {
        let downstream = system
            .find_package(DOWNSTREAM_PACKAGE)
            .map(|package| package.is_some())
            .unwrap_or_else(|e| {
                warn!("Could not detect downstream installation: {}", e);
                false
            });
        let server = system.is_server().unwrap_or_else(|e| {
            warn!("Could not detect server installation: {}", e);
            false
        });

        let features = Self {
            downstream,
            server,
            systemd: system.systemd_installed(),
        };
        debug!("Detected host features: {:?}", features);
        features
    }

    pub fn with_overrides(self, overrides: &FeatureOverrides) -> Self {
        Self {
            downstream: overrides.downstream.unwrap_or(self.downstream),
            server: overrides.server.unwrap_or(self.server),
            systemd: overrides.systemd.unwrap_or(self.systemd),
        }
    }
}
