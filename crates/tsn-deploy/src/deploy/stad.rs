//! Stream priority generation for streams classified per stream.

use tracing::{debug, instrument};

use crate::deploy::vlan::untags_via_hybrid;
use crate::error::{DeployError, DeployResult};
use crate::tables::{DeviceTables, StadConfigTable, StadPortEntry, StadPortTable};
use crate::topology::{RoutingResult, StreamMatch, TagMode, TopologyIndex};
use crate::walker::walk_routing_result;

pub(crate) struct StreamPriorityTables<'t> {
    pub ports: &'t mut DeviceTables<StadPortTable>,
    pub configs: &'t mut DeviceTables<StadConfigTable>,
}

pub(crate) fn generate(
    index: &TopologyIndex<'_>,
    mut tables: StreamPriorityTables<'_>,
) -> DeployResult<()> {
    for result in &index.snapshot().routing_results {
        if index.stream_setting(result.stream_id)?.tag_mode != TagMode::UntaggedStreamPriority {
            continue;
        }
        let stream_match = index.application_setting(result.stream_id)?.stream_match;
        generate_for_stream(index, result, stream_match, &mut tables)?;
    }
    Ok(())
}

/// The first capable bridge classifies the untagged frames into the stream
/// VLAN; the last one strips the tag again unless its VLAN membership
/// already does.
#[instrument(skip_all, fields(stream = result.stream_id))]
fn generate_for_stream(
    index: &TopologyIndex<'_>,
    result: &RoutingResult,
    stream_match: StreamMatch,
    tables: &mut StreamPriorityTables<'_>,
) -> DeployResult<()> {
    for walked in walk_routing_result(index, result)? {
        let mut capable = walked
            .hops
            .iter()
            .filter(|hop| hop.device.capabilities.supports_stream_priority(&stream_match));
        let first = capable.next().ok_or_else(|| {
            DeployError::internal(format!(
                "stream {} has no device able to classify {:?}",
                result.stream_id, stream_match
            ))
        })?;
        let last = capable.last().unwrap_or(first);

        if !first.kind.is_duplicate() {
            let port = first.ingress_interface().ok_or_else(|| {
                DeployError::internal(format!(
                    "device {} classifies stream {} but has no entry port",
                    first.device.id, result.stream_id
                ))
            })?;
            let added = tables.ports.entry(first.device.id).add(StadPortEntry {
                port,
                stream_match,
                vlan_id: result.vlan_id,
                pcp: result.pcp,
            });
            if added {
                debug!(device = first.device.id, port, "added ingress classification");
            }
        }

        if !last.kind.is_duplicate() {
            let port = last.egress_interface().ok_or_else(|| {
                DeployError::internal(format!(
                    "device {} releases stream {} but has no exit port",
                    last.device.id, result.stream_id
                ))
            })?;
            if !untags_via_hybrid(last) {
                let vlan = walked.path.vlan_id;
                if tables.configs.entry(last.device.id).set_untag(port, vlan) {
                    debug!(device = last.device.id, port, %vlan, "added egress untag");
                }
            }
        }
    }
    Ok(())
}
