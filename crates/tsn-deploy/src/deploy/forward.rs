//! Static forwarding table generation.

use tracing::{debug, instrument, warn};

use crate::error::DeployResult;
use crate::tables::{DeviceTables, StaticForwardTable};
use crate::topology::{RoutingResult, TopologyIndex};
use crate::walker::{walk_routing_result, HopKind};

/// Unicast and multicast entries are kept in separate universes.
pub(crate) struct ForwardTables<'t> {
    pub unicast: &'t mut DeviceTables<StaticForwardTable>,
    pub multicast: &'t mut DeviceTables<StaticForwardTable>,
}

pub(crate) fn generate(index: &TopologyIndex<'_>, tables: ForwardTables<'_>) -> DeployResult<()> {
    for result in &index.snapshot().routing_results {
        let universe = if result.multicast {
            &mut *tables.multicast
        } else {
            &mut *tables.unicast
        };
        generate_for_stream(index, result, universe)?;
    }
    Ok(())
}

#[instrument(skip_all, fields(stream = result.stream_id, multicast = result.multicast))]
fn generate_for_stream(
    index: &TopologyIndex<'_>,
    result: &RoutingResult,
    tables: &mut DeviceTables<StaticForwardTable>,
) -> DeployResult<()> {
    let mac = index.stream_setting(result.stream_id)?.destination_mac;
    if mac.is_multicast() != result.multicast {
        warn!(%mac, "destination MAC group bit disagrees with the routing result");
    }

    for walked in walk_routing_result(index, result)? {
        for hop in walked.hops.iter().filter(|hop| !hop.kind.is_duplicate()) {
            let capable = if result.multicast {
                hop.device.capabilities.static_forward_multicast
            } else {
                hop.device.capabilities.static_forward_unicast
            };
            let Some(port) = hop.egress_interface() else {
                continue;
            };
            if !capable {
                continue;
            }
            let vlan = if hop.kind == HopKind::Split {
                result.vlan_id
            } else {
                walked.path.vlan_id
            };
            if tables.entry(hop.device.id).add_port(vlan, mac, port) {
                debug!(device = hop.device.id, port, %vlan, "added forwarding port");
            }
        }
    }
    Ok(())
}
