//! VLAN static table generation.

use tracing::{debug, instrument};

use crate::error::DeployResult;
use crate::tables::{DeviceTables, VlanStaticTable};
use crate::topology::{RoutingResult, TagMode, TopologyIndex};
use crate::walker::{walk_routing_result, Hop, HopKind};

/// True when `hop` strips the tag itself through hybrid VLAN membership:
/// the device supports hybrid untagging and the next device does not relay
/// tagged frames.
pub(crate) fn untags_via_hybrid(hop: &Hop<'_>) -> bool {
    hop.device.capabilities.supports_hybrid_untag() && hop.next_is_untagged_edge()
}

fn egress_untagged(tag_mode: TagMode, hop: &Hop<'_>) -> bool {
    tag_mode.is_untagged() && untags_via_hybrid(hop)
}

pub(crate) fn generate(
    index: &TopologyIndex<'_>,
    tables: &mut DeviceTables<VlanStaticTable>,
) -> DeployResult<()> {
    for result in &index.snapshot().routing_results {
        generate_for_stream(index, result, tables)?;
    }
    Ok(())
}

#[instrument(skip_all, fields(stream = result.stream_id))]
fn generate_for_stream(
    index: &TopologyIndex<'_>,
    result: &RoutingResult,
    tables: &mut DeviceTables<VlanStaticTable>,
) -> DeployResult<()> {
    let setting = index.stream_setting(result.stream_id)?;

    for walked in walk_routing_result(index, result)? {
        let local_vlan = walked.path.vlan_id;
        for hop in walked.hops.iter().filter(|hop| !hop.kind.is_duplicate()) {
            let device = hop.device;
            if !device.capabilities.vlan_access_trunk {
                continue;
            }
            let te_mstid = device.capabilities.te_mstid;
            let table = tables.entry(device.id);

            if let Some(port) = hop.ingress_interface() {
                table.set_entry(port, result.pcp, local_vlan, false, te_mstid);
            }
            if let Some(port) = hop.egress_interface() {
                let untag = egress_untagged(setting.tag_mode, hop);
                table.set_entry(port, result.pcp, local_vlan, untag, te_mstid);
                if hop.kind == HopKind::Split && result.vlan_id != local_vlan {
                    table.set_entry(port, result.pcp, result.vlan_id, untag, te_mstid);
                }
                debug!(device = device.id, port, vlan = %local_vlan, untag, "registered egress");
            }
        }
    }
    Ok(())
}
