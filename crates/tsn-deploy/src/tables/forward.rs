//! Static MAC forwarding entries.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tsn_types::{MacAddress, VlanId};

use crate::topology::InterfaceId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticForwardEntry {
    pub vlan_id: VlanId,
    pub destination_mac: MacAddress,
    pub ports: BTreeSet<InterfaceId>,
}

/// Forwarding entries keyed by (VLAN, destination MAC).
///
/// Serialized as a plain entry list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<StaticForwardEntry>", into = "Vec<StaticForwardEntry>")]
pub struct StaticForwardTable {
    entries: BTreeMap<(VlanId, MacAddress), StaticForwardEntry>,
}

impl StaticForwardTable {
    /// Adds `port` to the entry for (`vlan`, `mac`), creating it if needed.
    /// Returns false when the port was already present.
    pub fn add_port(&mut self, vlan: VlanId, mac: MacAddress, port: InterfaceId) -> bool {
        self.entries
            .entry((vlan, mac))
            .or_insert_with(|| StaticForwardEntry {
                vlan_id: vlan,
                destination_mac: mac,
                ports: BTreeSet::new(),
            })
            .ports
            .insert(port)
    }

    pub fn entry(&self, vlan: VlanId, mac: MacAddress) -> Option<&StaticForwardEntry> {
        self.entries.get(&(vlan, mac))
    }

    pub fn entries(&self) -> impl Iterator<Item = &StaticForwardEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<StaticForwardEntry>> for StaticForwardTable {
    fn from(list: Vec<StaticForwardEntry>) -> Self {
        let mut table = Self::default();
        for entry in list {
            for port in entry.ports {
                table.add_port(entry.vlan_id, entry.destination_mac, port);
            }
        }
        table
    }
}

impl From<StaticForwardTable> for Vec<StaticForwardEntry> {
    fn from(table: StaticForwardTable) -> Self {
        table.entries.into_values().collect()
    }
}
