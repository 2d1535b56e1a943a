//! 802.1CB frame replication and elimination tables.
//!
//! All four lists merge on insert: an entry matching the new one on its
//! port set and stream handles absorbs it, anything else is appended.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;
use tsn_types::{MacAddress, Pcp, VlanId};

use crate::topology::InterfaceId;

pub type StreamHandle = u32;

/// One side of an active destination MAC and VLAN identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmacVlanParams {
    pub destination_mac: MacAddress,
    pub vlan_id: VlanId,
    pub priority: Pcp,
    pub handle: StreamHandle,
}

/// How frames are mapped to a stream handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamIdentification {
    /// Destination MAC and VLAN, frames left unchanged.
    Null {
        destination_mac: MacAddress,
        vlan_id: VlanId,
    },
    SourceMacVlan {
        source_mac: MacAddress,
        vlan_id: VlanId,
    },
    /// Active identification rewriting `down` frames into `up` frames.
    DestinationMacVlan {
        down: DmacVlanParams,
        up: DmacVlanParams,
    },
    Ip {
        destination_mac: MacAddress,
        vlan_id: VlanId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_ip: Option<IpAddr>,
        destination_ip: IpAddr,
    },
}

impl StreamIdentification {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StreamIdentification::Null { .. } => "Null",
            StreamIdentification::SourceMacVlan { .. } => "SourceMacVlan",
            StreamIdentification::DestinationMacVlan { .. } => "DestinationMacVlan",
            StreamIdentification::Ip { .. } => "Ip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamIdentityEntry {
    pub handle: StreamHandle,
    pub input_ports: BTreeSet<InterfaceId>,
    pub output_ports: BTreeSet<InterfaceId>,
    pub identification: StreamIdentification,
}

impl StreamIdentityEntry {
    fn shares_port_with(&self, other: &StreamIdentityEntry) -> bool {
        !self.input_ports.is_disjoint(&other.input_ports)
            || !self.output_ports.is_disjoint(&other.output_ports)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// R-tag encoding on a port. Active entries insert or strip the tag,
/// passive ones pass it through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceIdentificationEntry {
    pub port: InterfaceId,
    pub direction: PortDirection,
    pub handles: BTreeSet<StreamHandle>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceGenerationEntry {
    pub handles: BTreeSet<StreamHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecoveryAlgorithm {
    Vector,
    Match,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecoveryEntry {
    pub ports: BTreeSet<InterfaceId>,
    pub handles: BTreeSet<StreamHandle>,
    pub algorithm: RecoveryAlgorithm,
    /// Only the vector algorithm keeps a history window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<u8>,
    pub reset_timeout_ms: u32,
    pub individual_recovery: bool,
}

impl SequenceRecoveryEntry {
    pub fn covers(&self, port: InterfaceId, handle: StreamHandle) -> bool {
        self.ports.contains(&port) && self.handles.contains(&handle)
    }

    fn overlaps(&self, port: InterfaceId, handles: &BTreeSet<StreamHandle>) -> bool {
        self.ports.contains(&port) && !self.handles.is_disjoint(handles)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CbTable {
    pub stream_identities: Vec<StreamIdentityEntry>,
    pub sequence_identifications: Vec<SequenceIdentificationEntry>,
    pub sequence_generations: Vec<SequenceGenerationEntry>,
    pub sequence_recoveries: Vec<SequenceRecoveryEntry>,
}

impl CbTable {
    /// Merges ports into an entry with the same handle and identification
    /// sharing a port, or appends. Returns true when appended.
    pub fn add_stream_identity(&mut self, entry: StreamIdentityEntry) -> bool {
        let existing = self.stream_identities.iter_mut().find(|e| {
            e.handle == entry.handle
                && e.identification == entry.identification
                && e.shares_port_with(&entry)
        });
        match existing {
            Some(e) => {
                e.input_ports.extend(entry.input_ports);
                e.output_ports.extend(entry.output_ports);
                false
            }
            None => {
                self.stream_identities.push(entry);
                true
            }
        }
    }

    /// Adds `handle` to the R-tag entry of (`port`, `direction`) with the
    /// same activity, or appends one.
    pub fn add_sequence_identification(
        &mut self,
        port: InterfaceId,
        direction: PortDirection,
        handle: StreamHandle,
        active: bool,
    ) -> bool {
        let existing = self
            .sequence_identifications
            .iter_mut()
            .find(|e| e.port == port && e.direction == direction && e.active == active);
        match existing {
            Some(e) => {
                e.handles.insert(handle);
                false
            }
            None => {
                self.sequence_identifications
                    .push(SequenceIdentificationEntry {
                        port,
                        direction,
                        handles: BTreeSet::from([handle]),
                        active,
                    });
                true
            }
        }
    }

    pub fn add_sequence_generation(&mut self, handle: StreamHandle) -> bool {
        if self
            .sequence_generations
            .iter()
            .any(|e| e.handles.contains(&handle))
        {
            return false;
        }
        self.sequence_generations.push(SequenceGenerationEntry {
            handles: BTreeSet::from([handle]),
        });
        true
    }

    /// Match-algorithm recovery of `handle` on egress `port`. Nothing is
    /// written when (`port`, `handle`) is already recovered.
    pub fn add_individual_recovery(
        &mut self,
        port: InterfaceId,
        handle: StreamHandle,
        reset_timeout_ms: u32,
    ) -> bool {
        if self.recoveries_covering(port, handle) > 0 {
            return false;
        }
        self.sequence_recoveries.push(SequenceRecoveryEntry {
            ports: BTreeSet::from([port]),
            handles: BTreeSet::from([handle]),
            algorithm: RecoveryAlgorithm::Match,
            history_length: None,
            reset_timeout_ms,
            individual_recovery: true,
        });
        true
    }

    /// Vector-algorithm recovery over `handles` on egress `port`.
    ///
    /// Entries on `port` recovering any of `handles` are folded into one
    /// entry upgraded to the vector algorithm, so each (port, handle) pair
    /// stays recovered exactly once.
    pub fn add_vector_recovery(
        &mut self,
        port: InterfaceId,
        handles: &[StreamHandle],
        history_length: u8,
        reset_timeout_ms: u32,
    ) {
        let wanted: BTreeSet<StreamHandle> = handles.iter().copied().collect();
        let mut merged = SequenceRecoveryEntry {
            ports: BTreeSet::from([port]),
            handles: wanted.clone(),
            algorithm: RecoveryAlgorithm::Vector,
            history_length: Some(history_length),
            reset_timeout_ms,
            individual_recovery: false,
        };

        let mut position = None;
        let mut kept = Vec::with_capacity(self.sequence_recoveries.len());
        for entry in self.sequence_recoveries.drain(..) {
            if entry.overlaps(port, &wanted) {
                merged.ports.extend(entry.ports);
                merged.handles.extend(entry.handles);
                position.get_or_insert(kept.len());
            } else {
                kept.push(entry);
            }
        }
        let at = position.unwrap_or(kept.len());
        kept.insert(at, merged);
        self.sequence_recoveries = kept;
    }

    /// Number of recovery entries handling (`port`, `handle`).
    pub fn recoveries_covering(&self, port: InterfaceId, handle: StreamHandle) -> usize {
        self.sequence_recoveries
            .iter()
            .filter(|e| e.covers(port, handle))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.stream_identities.is_empty()
            && self.sequence_identifications.is_empty()
            && self.sequence_generations.is_empty()
            && self.sequence_recoveries.is_empty()
    }
}
