//! Per-device configuration table families.
//!
//! Each family is stored in a [`DeviceTables`] map holding at most one
//! table per device. Generators look the device's table up and mutate it
//! in place; the merge policy of every write lives on the table type.

mod cb;
mod forward;
mod gcl;
mod port_vlan;
mod stad;
mod vlan;

pub use cb::{
    CbTable, DmacVlanParams, PortDirection, RecoveryAlgorithm, SequenceGenerationEntry,
    SequenceIdentificationEntry, SequenceRecoveryEntry, StreamHandle, StreamIdentification,
    StreamIdentityEntry,
};
pub use forward::{StaticForwardEntry, StaticForwardTable};
pub use gcl::{
    GateControlEntry, GateOperation, GateParameters, GclTable, PtpTime, Rational,
    NANOS_PER_SECOND,
};
pub use port_vlan::{DefaultPriorityTable, PortVlanTable};
pub use stad::{StadConfigEntry, StadConfigTable, StadPortEntry, StadPortTable};
pub use vlan::{VlanPortTypeTable, VlanStaticEntry, VlanStaticTable};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{DeployError, DeployResult};
use crate::topology::{Capability, DeviceId};

/// Tables of one family keyed by device id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceTables<T> {
    tables: BTreeMap<DeviceId, T>,
}

impl<T> Default for DeviceTables<T> {
    fn default() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }
}

impl<T> DeviceTables<T> {
    pub fn get(&self, device: DeviceId) -> Option<&T> {
        self.tables.get(&device)
    }

    pub fn get_mut(&mut self, device: DeviceId) -> Option<&mut T> {
        self.tables.get_mut(&device)
    }

    pub fn contains(&self, device: DeviceId) -> bool {
        self.tables.contains_key(&device)
    }

    /// Stores `table` unless the device already has one. First wins.
    pub fn insert_if_absent(&mut self, device: DeviceId, table: T) -> bool {
        if self.tables.contains_key(&device) {
            return false;
        }
        self.tables.insert(device, table);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, &T)> {
        self.tables.iter().map(|(device, table)| (*device, table))
    }

    pub fn devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.tables.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl<T: Default> DeviceTables<T> {
    /// The device's table, created empty on first use.
    pub fn entry(&mut self, device: DeviceId) -> &mut T {
        self.tables.entry(device).or_default()
    }
}

/// Table family names as used by the southbound Configure/Scan contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableFamily {
    Gcl,
    VlanStatic,
    VlanPortType,
    StaticForwardUnicast,
    StaticForwardMulticast,
    PortVlan,
    DefaultPriority,
    StadPort,
    StadConfig,
    Cb,
}

impl TableFamily {
    pub const ALL: [TableFamily; 10] = [
        TableFamily::Gcl,
        TableFamily::VlanStatic,
        TableFamily::VlanPortType,
        TableFamily::StaticForwardUnicast,
        TableFamily::StaticForwardMulticast,
        TableFamily::PortVlan,
        TableFamily::DefaultPriority,
        TableFamily::StadPort,
        TableFamily::StadConfig,
        TableFamily::Cb,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            TableFamily::Gcl => "GclTable",
            TableFamily::VlanStatic => "VlanStaticTable",
            TableFamily::VlanPortType => "VlanPortTypeTable",
            TableFamily::StaticForwardUnicast => "StaticForwardUnicastTable",
            TableFamily::StaticForwardMulticast => "StaticForwardMulticastTable",
            TableFamily::PortVlan => "PortVlanTable",
            TableFamily::DefaultPriority => "DefaultPriorityTable",
            TableFamily::StadPort => "StadPortTable",
            TableFamily::StadConfig => "StadConfigTable",
            TableFamily::Cb => "CbTable",
        }
    }

    /// Capabilities of which at least one makes a device use this family.
    pub const fn capabilities(&self) -> &'static [Capability] {
        match self {
            TableFamily::Gcl => &[Capability::Qbv],
            TableFamily::VlanStatic | TableFamily::VlanPortType => &[Capability::VlanAccessTrunk],
            TableFamily::StaticForwardUnicast => &[Capability::StaticForwardUnicast],
            TableFamily::StaticForwardMulticast => &[Capability::StaticForwardMulticast],
            TableFamily::PortVlan => &[Capability::DefaultPvid],
            TableFamily::DefaultPriority => &[Capability::DefaultPcp],
            TableFamily::StadPort | TableFamily::StadConfig => {
                &[Capability::StreamPriorityV1, Capability::StreamPriorityV2]
            }
            TableFamily::Cb => &[Capability::Cb],
        }
    }
}

impl fmt::Display for TableFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableFamily {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableFamily::ALL
            .into_iter()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| DeployError::parse("table family", format!("unknown family '{s}'")))
    }
}

/// Every table generated in one deployment cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployTables {
    pub gcl: DeviceTables<GclTable>,
    pub vlan_static: DeviceTables<VlanStaticTable>,
    pub vlan_port_type: DeviceTables<VlanPortTypeTable>,
    pub static_forward_unicast: DeviceTables<StaticForwardTable>,
    pub static_forward_multicast: DeviceTables<StaticForwardTable>,
    pub port_vlan: DeviceTables<PortVlanTable>,
    pub default_priority: DeviceTables<DefaultPriorityTable>,
    pub stad_port: DeviceTables<StadPortTable>,
    pub stad_config: DeviceTables<StadConfigTable>,
    pub cb: DeviceTables<CbTable>,
}

impl DeployTables {
    /// Number of devices holding a table of `family`.
    pub fn device_count(&self, family: TableFamily) -> usize {
        match family {
            TableFamily::Gcl => self.gcl.len(),
            TableFamily::VlanStatic => self.vlan_static.len(),
            TableFamily::VlanPortType => self.vlan_port_type.len(),
            TableFamily::StaticForwardUnicast => self.static_forward_unicast.len(),
            TableFamily::StaticForwardMulticast => self.static_forward_multicast.len(),
            TableFamily::PortVlan => self.port_vlan.len(),
            TableFamily::DefaultPriority => self.default_priority.len(),
            TableFamily::StadPort => self.stad_port.len(),
            TableFamily::StadConfig => self.stad_config.len(),
            TableFamily::Cb => self.cb.len(),
        }
    }

    pub fn to_json_pretty(&self) -> DeployResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DeployError::parse("deploy tables", e))
    }

    pub fn from_json_str(text: &str) -> DeployResult<Self> {
        serde_json::from_str(text).map_err(|e| DeployError::parse("deploy tables", e))
    }
}
