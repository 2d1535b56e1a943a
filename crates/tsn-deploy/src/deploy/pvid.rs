//! Port VLAN and default priority generation for PVID-untagged streams.

use tracing::{debug, instrument, warn};
use tsn_types::{Pcp, VlanId};

use crate::error::{DeployError, DeployResult};
use crate::tables::{DefaultPriorityTable, DeviceTables, PortVlanTable};
use crate::topology::{DeviceId, InterfaceId, RoutingResult, TagMode, TopologyIndex};
use crate::walker::walk_routing_result;

pub(crate) struct PortDefaultTables<'t> {
    pub port_vlan: &'t mut DeviceTables<PortVlanTable>,
    pub default_priority: &'t mut DeviceTables<DefaultPriorityTable>,
}

pub(crate) fn write_port_vlan(
    tables: &mut DeviceTables<PortVlanTable>,
    device: DeviceId,
    port: InterfaceId,
    vlan: VlanId,
) -> DeployResult<()> {
    tables.entry(device).set_pvid(port, vlan).inspect_err(|err| {
        warn!(device, port, %vlan, "rejected PVID rewrite: {}", err);
    })
}

pub(crate) fn write_default_priority(
    tables: &mut DeviceTables<DefaultPriorityTable>,
    device: DeviceId,
    port: InterfaceId,
    pcp: Pcp,
) -> DeployResult<()> {
    tables.entry(device).set_pcp(port, pcp).inspect_err(|err| {
        warn!(device, port, %pcp, "rejected default PCP rewrite: {}", err);
    })
}

pub(crate) fn generate(
    index: &TopologyIndex<'_>,
    mut tables: PortDefaultTables<'_>,
) -> DeployResult<()> {
    for result in &index.snapshot().routing_results {
        if index.stream_setting(result.stream_id)?.tag_mode != TagMode::UntaggedPvid {
            continue;
        }
        generate_for_stream(index, result, &mut tables)?;
    }
    Ok(())
}

/// Untagged frames of the stream get their VLAN and priority at the first
/// bridge able to assign a port default.
#[instrument(skip_all, fields(stream = result.stream_id))]
fn generate_for_stream(
    index: &TopologyIndex<'_>,
    result: &RoutingResult,
    tables: &mut PortDefaultTables<'_>,
) -> DeployResult<()> {
    for walked in walk_routing_result(index, result)? {
        let hop = walked
            .hops
            .iter()
            .find(|hop| hop.device.capabilities.default_pvid)
            .ok_or_else(|| {
                DeployError::internal(format!(
                    "stream {} has no device supporting a default PVID",
                    result.stream_id
                ))
            })?;
        if hop.kind.is_duplicate() {
            continue;
        }
        let port = hop.ingress_interface().ok_or_else(|| {
            DeployError::internal(format!(
                "device {} assigns the PVID of stream {} but has no entry port",
                hop.device.id, result.stream_id
            ))
        })?;

        write_port_vlan(tables.port_vlan, hop.device.id, port, result.vlan_id)?;
        if hop.device.capabilities.default_pcp {
            write_default_priority(tables.default_priority, hop.device.id, port, result.pcp)?;
        }
        debug!(device = hop.device.id, port, vlan = %result.vlan_id, "assigned port default");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{diamond_snapshot, line_snapshot};
    use crate::topology::Snapshot;
    use pretty_assertions::assert_eq;

    fn pvid_line() -> Snapshot {
        let mut snapshot = line_snapshot();
        snapshot.traffic_design.stream_settings.get_mut(&1).unwrap().tag_mode =
            TagMode::UntaggedPvid;
        snapshot
    }

    fn run(
        snapshot: &Snapshot,
    ) -> DeployResult<(DeviceTables<PortVlanTable>, DeviceTables<DefaultPriorityTable>)> {
        let index = TopologyIndex::new(snapshot)?;
        let mut port_vlan = DeviceTables::default();
        let mut default_priority = DeviceTables::default();
        generate(
            &index,
            PortDefaultTables {
                port_vlan: &mut port_vlan,
                default_priority: &mut default_priority,
            },
        )?;
        Ok((port_vlan, default_priority))
    }

    #[test]
    fn test_first_capable_bridge_gets_pvid_and_pcp() {
        let (port_vlan, default_priority) = run(&pvid_line()).unwrap();
        assert_eq!(port_vlan.devices().collect::<Vec<_>>(), vec![2]);
        assert_eq!(port_vlan.get(2).unwrap().pvid(1), VlanId::new(100).ok());
        assert_eq!(default_priority.get(2).unwrap().pcp(1), Pcp::new(5).ok());
    }

    #[test]
    fn test_pcp_needs_its_own_capability() {
        let mut snapshot = pvid_line();
        snapshot.devices[1].capabilities.default_pcp = false;
        let (port_vlan, default_priority) = run(&snapshot).unwrap();
        assert!(port_vlan.contains(2));
        assert!(default_priority.is_empty());
    }

    #[test]
    fn test_no_capable_device_is_internal_error() {
        let mut snapshot = pvid_line();
        for device in &mut snapshot.devices {
            device.capabilities.default_pvid = false;
        }
        let err = run(&snapshot).unwrap_err();
        assert!(matches!(err, DeployError::Internal { .. }));
    }

    #[test]
    fn test_capable_talker_has_no_entry_port() {
        let mut snapshot = pvid_line();
        snapshot.devices[0].capabilities.default_pvid = true;
        assert!(matches!(run(&snapshot), Err(DeployError::Internal { .. })));
    }

    #[test]
    fn test_tagged_streams_are_ignored() {
        let (port_vlan, _) = run(&line_snapshot()).unwrap();
        assert!(port_vlan.is_empty());
    }

    #[test]
    fn test_shared_entry_written_once_per_routing_result() {
        let mut snapshot = diamond_snapshot();
        snapshot.traffic_design.stream_settings.get_mut(&2).unwrap().tag_mode =
            TagMode::UntaggedPvid;
        let (port_vlan, _) = run(&snapshot).unwrap();
        assert_eq!(
            port_vlan.get(2).unwrap().iter().collect::<Vec<_>>(),
            vec![(1, VlanId::new(10).unwrap())]
        );
    }

    #[test]
    fn test_conflicting_streams_are_rejected() {
        let mut snapshot = pvid_line();
        let mut second = snapshot.routing_results[0].clone();
        second.stream_id = 9;
        second.vlan_id = VlanId::new(200).unwrap();
        snapshot.routing_results.push(second);
        let setting = snapshot.traffic_design.stream_settings[&1].clone();
        snapshot.traffic_design.stream_settings.insert(9, setting);

        let err = run(&snapshot).unwrap_err();
        assert!(err.to_string().contains("PVID conflict"));
    }
}
