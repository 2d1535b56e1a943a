//! Per-stream priority classification (ingress) and untag (egress) rules.

use serde::{Deserialize, Serialize};
use tsn_types::{Pcp, VlanId};

use crate::topology::{InterfaceId, StreamMatch};

/// Classifies matching untagged frames arriving on `port` into a VLAN and
/// priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StadPortEntry {
    pub port: InterfaceId,
    pub stream_match: StreamMatch,
    pub vlan_id: VlanId,
    pub pcp: Pcp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StadPortTable {
    entries: Vec<StadPortEntry>,
}

impl StadPortTable {
    /// Appends `entry` unless an identical one exists.
    pub fn add(&mut self, entry: StadPortEntry) -> bool {
        if self.entries.contains(&entry) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[StadPortEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Strips the VLAN tag of `vlan_id` on egress through `port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StadConfigEntry {
    pub port: InterfaceId,
    pub vlan_id: VlanId,
    pub untag: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StadConfigTable {
    entries: Vec<StadConfigEntry>,
}

impl StadConfigTable {
    /// Marks (`port`, `vlan`) for untagging. Returns false if already set.
    pub fn set_untag(&mut self, port: InterfaceId, vlan: VlanId) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.port == port && entry.vlan_id == vlan)
        {
            Some(entry) if entry.untag => false,
            Some(entry) => {
                entry.untag = true;
                true
            }
            None => {
                self.entries.push(StadConfigEntry {
                    port,
                    vlan_id: vlan,
                    untag: true,
                });
                true
            }
        }
    }

    pub fn entries(&self) -> &[StadConfigEntry] {
        &self.entries
    }

    pub fn is_untagged(&self, port: InterfaceId, vlan: VlanId) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.port == port && entry.vlan_id == vlan && entry.untag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
