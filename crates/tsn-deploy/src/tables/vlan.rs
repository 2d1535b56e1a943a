//! 802.1Q static VLAN registration and derived port types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tsn_types::{Pcp, VlanId, VlanPortType};

use crate::topology::{Device, InterfaceId};

/// Static VLAN registration of one VLAN on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanStaticEntry {
    pub vlan_id: VlanId,
    /// Member ports. Only ever grows.
    pub egress_ports: BTreeSet<InterfaceId>,
    /// Members that strip the tag on egress. Always a subset of
    /// `egress_ports`.
    pub untagged_ports: BTreeSet<InterfaceId>,
    pub priority: Pcp,
    pub te_mstid: bool,
}

impl VlanStaticEntry {
    pub fn new(vlan_id: VlanId, priority: Pcp, te_mstid: bool) -> Self {
        Self {
            vlan_id,
            egress_ports: BTreeSet::new(),
            untagged_ports: BTreeSet::new(),
            priority,
            te_mstid,
        }
    }

    pub fn is_member(&self, port: InterfaceId) -> bool {
        self.egress_ports.contains(&port)
    }

    pub fn is_untagged(&self, port: InterfaceId) -> bool {
        self.untagged_ports.contains(&port)
    }
}

/// A device's VLAN registrations keyed by VLAN id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanStaticTable {
    entries: BTreeMap<VlanId, VlanStaticEntry>,
}

impl VlanStaticTable {
    /// Adds `port` to `vlan` and sets or clears its untag bit.
    ///
    /// The entry is created with `priority` and `te_mstid` on first use;
    /// later calls keep the values it was created with.
    pub fn set_entry(
        &mut self,
        port: InterfaceId,
        priority: Pcp,
        vlan: VlanId,
        untag: bool,
        te_mstid: bool,
    ) -> &VlanStaticEntry {
        let entry = self
            .entries
            .entry(vlan)
            .or_insert_with(|| VlanStaticEntry::new(vlan, priority, te_mstid));
        entry.egress_ports.insert(port);
        if untag {
            entry.untagged_ports.insert(port);
        } else {
            entry.untagged_ports.remove(&port);
        }
        entry
    }

    pub fn entry(&self, vlan: VlanId) -> Option<&VlanStaticEntry> {
        self.entries.get(&vlan)
    }

    pub fn entries(&self) -> impl Iterator<Item = &VlanStaticEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if `port` is a member of any VLAN.
    pub fn is_member(&self, port: InterfaceId) -> bool {
        self.entries().any(|entry| entry.is_member(port))
    }

    /// True if `port` is untagged in any VLAN.
    pub fn is_untagged(&self, port: InterfaceId) -> bool {
        self.entries().any(|entry| entry.is_untagged(port))
    }
}

/// Access/trunk/hybrid mode of every port of a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanPortTypeTable {
    ports: BTreeMap<InterfaceId, VlanPortType>,
}

impl VlanPortTypeTable {
    /// Derives the mode of each interface of `device` from its final VLAN
    /// registrations. A device without registrations gets all access ports.
    pub fn derive(device: &Device, vlans: Option<&VlanStaticTable>) -> Self {
        let hybrid = device.capabilities.vlan_hybrid;
        let ports = device
            .interfaces
            .iter()
            .map(|interface| {
                let port = interface.id;
                let port_type = match vlans {
                    Some(table) if hybrid && table.is_untagged(port) => VlanPortType::Hybrid,
                    Some(table) if table.is_member(port) => VlanPortType::Trunk,
                    _ => VlanPortType::Access,
                };
                (port, port_type)
            })
            .collect();
        Self { ports }
    }

    pub fn set(&mut self, port: InterfaceId, port_type: VlanPortType) {
        self.ports.insert(port, port_type);
    }

    pub fn get(&self, port: InterfaceId) -> Option<VlanPortType> {
        self.ports.get(&port).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InterfaceId, VlanPortType)> + '_ {
        self.ports.iter().map(|(port, port_type)| (*port, *port_type))
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
