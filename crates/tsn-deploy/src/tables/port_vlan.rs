//! Single-valued per-port defaults: PVID and default PCP.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::Display;
use tsn_types::{Pcp, VlanId};

use crate::error::{DeployError, DeployResult};
use crate::topology::InterfaceId;

/// Stores `value` for `port` unless a different value is already set.
fn set_once<V>(
    values: &mut BTreeMap<InterfaceId, V>,
    port: InterfaceId,
    value: V,
    what: &str,
) -> DeployResult<()>
where
    V: PartialEq + Display,
{
    match values.entry(port) {
        Entry::Vacant(slot) => {
            slot.insert(value);
            Ok(())
        }
        Entry::Occupied(slot) if *slot.get() == value => Ok(()),
        Entry::Occupied(slot) => Err(DeployError::internal(format!(
            "{} conflict on port {}: already {}, refusing {}",
            what,
            port,
            slot.get(),
            value
        ))),
    }
}

/// Port VLAN id assigned to untagged ingress frames.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortVlanTable {
    pvids: BTreeMap<InterfaceId, VlanId>,
}

impl PortVlanTable {
    /// Sets the PVID of `port`. Rewriting the same value is a no-op; a
    /// different value is an internal error and leaves the table unchanged.
    pub fn set_pvid(&mut self, port: InterfaceId, vlan: VlanId) -> DeployResult<()> {
        set_once(&mut self.pvids, port, vlan, "PVID")
    }

    pub fn pvid(&self, port: InterfaceId) -> Option<VlanId> {
        self.pvids.get(&port).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InterfaceId, VlanId)> + '_ {
        self.pvids.iter().map(|(port, vlan)| (*port, *vlan))
    }

    pub fn len(&self) -> usize {
        self.pvids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pvids.is_empty()
    }
}

/// Priority assigned to untagged ingress frames.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultPriorityTable {
    pcps: BTreeMap<InterfaceId, Pcp>,
}

impl DefaultPriorityTable {
    /// Same write rule as [`PortVlanTable::set_pvid`].
    pub fn set_pcp(&mut self, port: InterfaceId, pcp: Pcp) -> DeployResult<()> {
        set_once(&mut self.pcps, port, pcp, "default PCP")
    }

    pub fn pcp(&self, port: InterfaceId) -> Option<Pcp> {
        self.pcps.get(&port).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InterfaceId, Pcp)> + '_ {
        self.pcps.iter().map(|(port, pcp)| (*port, *pcp))
    }

    pub fn len(&self) -> usize {
        self.pcps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pcps.is_empty()
    }
}
