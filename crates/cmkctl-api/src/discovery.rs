//! Service discovery modes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mode passed to the `discover_services` action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Add unmonitored services
    New,
    /// Remove vanished services
    Remove,
    /// Add new services and remove vanished ones
    FixAll,
    /// Rescan the host and refresh the service list
    Refresh,
    /// Only update host labels
    OnlyHostLabels,
}

impl DiscoveryMode {
    /// All accepted modes
    pub const ALL: [DiscoveryMode; 5] = [
        DiscoveryMode::New,
        DiscoveryMode::Remove,
        DiscoveryMode::FixAll,
        DiscoveryMode::Refresh,
        DiscoveryMode::OnlyHostLabels,
    ];

    /// Wire name of the mode
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DiscoveryMode::New => "new",
            DiscoveryMode::Remove => "remove",
            DiscoveryMode::FixAll => "fix_all",
            DiscoveryMode::Refresh => "refresh",
            DiscoveryMode::OnlyHostLabels => "only_host_labels",
        }
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known discovery modes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid discovery mode '{0}', expected one of: new, remove, fix_all, refresh, only_host_labels")]
pub struct ParseDiscoveryModeError(pub String);

impl FromStr for DiscoveryMode {
    type Err = ParseDiscoveryModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiscoveryMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ParseDiscoveryModeError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_modes() {
        for mode in DiscoveryMode::ALL {
            assert_eq!(mode.as_str().parse::<DiscoveryMode>(), Ok(mode));
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "fixall".parse::<DiscoveryMode>().unwrap_err();
        assert_eq!(err.0, "fixall");
        assert!("".parse::<DiscoveryMode>().is_err());
        assert!("Refresh".parse::<DiscoveryMode>().is_err());
    }

    #[test]
    fn test_serializes_as_wire_name() {
        let json = serde_json::to_string(&DiscoveryMode::OnlyHostLabels).unwrap();
        assert_eq!(json, "\"only_host_labels\"");
    }
}
