//! 802.1CB (FRER) table generation.
//!
//! Each CB stream gets three stream handles: one before the paths split,
//! one shared by every branch after a split (the branches differ by VLAN),
//! and one after the branches merge again.

use std::collections::BTreeSet;
use tracing::{debug, instrument};

use crate::config::FrerConfig;
use crate::error::{DeployError, DeployResult};
use crate::tables::{
    CbTable, DeviceTables, DmacVlanParams, PortDirection, StreamHandle, StreamIdentification,
    StreamIdentityEntry,
};
use crate::topology::{InterfaceId, RoutingResult, StreamSetting, TopologyIndex};
use crate::walker::{walk_routing_result, Hop, HopKind};

/// Stream handles reserved for one CB stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrerHandles {
    pub pre_split: StreamHandle,
    pub post_split: StreamHandle,
    pub post_merge: StreamHandle,
}

/// Hands out stream handles in increasing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandleAllocator {
    next: StreamHandle,
}

impl StreamHandleAllocator {
    pub fn new(first: StreamHandle) -> Self {
        Self { next: first }
    }

    /// The handle the next reservation starts at.
    pub fn peek(&self) -> StreamHandle {
        self.next
    }

    pub fn reserve(&mut self) -> DeployResult<FrerHandles> {
        let exhausted = || DeployError::internal("stream handle space exhausted");
        let pre_split = self.next;
        let handles = FrerHandles {
            pre_split,
            post_split: pre_split.checked_add(1).ok_or_else(exhausted)?,
            post_merge: pre_split.checked_add(2).ok_or_else(exhausted)?,
        };
        self.next = pre_split.checked_add(3).ok_or_else(exhausted)?;
        Ok(handles)
    }
}

pub(crate) fn generate(
    index: &TopologyIndex<'_>,
    config: &FrerConfig,
    allocator: &mut StreamHandleAllocator,
    tables: &mut DeviceTables<CbTable>,
) -> DeployResult<()> {
    for result in index.snapshot().routing_results.iter().filter(|r| r.cb) {
        let handles = allocator.reserve()?;
        generate_for_stream(index, config, result, handles, tables)?;
    }
    Ok(())
}

/// Identification used where the talker's frames enter the CB domain.
fn talker_identification(setting: &StreamSetting, result: &RoutingResult) -> StreamIdentification {
    match (setting.destination_ip, setting.source_mac) {
        (Some(destination_ip), _) => StreamIdentification::Ip {
            destination_mac: setting.destination_mac,
            vlan_id: result.vlan_id,
            source_ip: setting.source_ip,
            destination_ip,
        },
        (None, Some(source_mac)) if result.multicast => StreamIdentification::SourceMacVlan {
            source_mac,
            vlan_id: result.vlan_id,
        },
        _ => StreamIdentification::Null {
            destination_mac: setting.destination_mac,
            vlan_id: result.vlan_id,
        },
    }
}

fn port_set(port: Option<InterfaceId>) -> BTreeSet<InterfaceId> {
    port.into_iter().collect()
}

#[instrument(skip_all, fields(stream = result.stream_id, handle = handles.pre_split))]
fn generate_for_stream(
    index: &TopologyIndex<'_>,
    config: &FrerConfig,
    result: &RoutingResult,
    handles: FrerHandles,
    tables: &mut DeviceTables<CbTable>,
) -> DeployResult<()> {
    let setting = index.stream_setting(result.stream_id)?;

    for walked in walk_routing_result(index, result)? {
        let talker_side = walked
            .hops
            .iter()
            .position(|hop| hop.device.capabilities.cb)
            .ok_or_else(|| {
                DeployError::internal(format!(
                    "stream {} requests FRER but no device on its path supports 802.1CB",
                    result.stream_id
                ))
            })?;

        let mut handle = handles.pre_split;
        for hop in walked.hops.iter().filter(|hop| hop.device.capabilities.cb) {
            let table = tables.entry(hop.device.id);
            match hop.kind {
                HopKind::Duplicate => continue,
                HopKind::Split => {
                    let up = DmacVlanParams {
                        destination_mac: setting.destination_mac,
                        vlan_id: walked.path.vlan_id,
                        priority: result.pcp,
                        handle: handles.post_split,
                    };
                    table.add_stream_identity(StreamIdentityEntry {
                        handle: handles.post_split,
                        input_ports: port_set(hop.ingress_interface()),
                        output_ports: port_set(hop.egress_interface()),
                        identification: StreamIdentification::DestinationMacVlan {
                            down: DmacVlanParams {
                                vlan_id: result.vlan_id,
                                handle: handles.pre_split,
                                ..up
                            },
                            up,
                        },
                    });
                    handle = handles.post_split;
                    debug!(device = hop.device.id, "split into branch");
                }
                HopKind::Merge => {
                    if let Some(port) = hop.egress_interface() {
                        table.add_vector_recovery(
                            port,
                            &[handles.pre_split, handles.post_merge],
                            config.history_length,
                            config.reset_timeout_ms,
                        );
                        debug!(device = hop.device.id, port, "vector recovery at merge");
                    }
                    handle = handles.post_merge;
                }
                HopKind::Forward if hop.index == talker_side => {
                    table.add_stream_identity(StreamIdentityEntry {
                        handle: handles.pre_split,
                        input_ports: port_set(hop.ingress_interface()),
                        output_ports: port_set(hop.egress_interface()),
                        identification: talker_identification(setting, result),
                    });
                    table.add_sequence_generation(handles.pre_split);
                    debug!(device = hop.device.id, "sequence generation");
                }
                HopKind::Forward => {
                    if let Some(port) = hop.egress_interface() {
                        table.add_individual_recovery(port, handle, config.reset_timeout_ms);
                    }
                }
            }
            add_egress_encoding(table, hop, handle);
        }
    }
    Ok(())
}

/// R-tag on the way out: passive toward another CB bridge, active toward a
/// device that cannot handle it.
fn add_egress_encoding(table: &mut CbTable, hop: &Hop<'_>, handle: StreamHandle) {
    if let Some(port) = hop.egress_interface() {
        let active = !hop.next.is_some_and(|next| next.capabilities.cb);
        table.add_sequence_identification(port, PortDirection::Output, handle, active);
    }
}
