//! VLAN port mode of a bridge port.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// VLAN membership mode derived for a bridge port.
///
/// The string forms (`Access`, `Trunk`, `Hybrid`) are the names persisted in
/// JSON baselines and consumed by the southbound appliers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VlanPortType {
    /// Single untagged VLAN, the factory default.
    #[default]
    Access,
    /// Tagged member of one or more VLANs.
    Trunk,
    /// Tagged and untagged memberships on the same port.
    Hybrid,
}

impl VlanPortType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            VlanPortType::Access => "Access",
            VlanPortType::Trunk => "Trunk",
            VlanPortType::Hybrid => "Hybrid",
        }
    }
}

impl fmt::Display for VlanPortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VlanPortType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Access" => Ok(VlanPortType::Access),
            "Trunk" => Ok(VlanPortType::Trunk),
            "Hybrid" => Ok(VlanPortType::Hybrid),
            _ => Err(ParseError::InvalidVlanPortType(s.to_string())),
        }
    }
}
