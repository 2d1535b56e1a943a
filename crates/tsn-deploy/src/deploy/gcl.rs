//! Gate control list generation from computed schedules.

use tracing::{debug, instrument};

use crate::config::GclConfig;
use crate::error::{DeployError, DeployResult};
use crate::tables::{DeviceTables, GateParameters, GclTable};
use crate::topology::{GclResult, TopologyIndex};

pub(crate) fn generate(
    index: &TopologyIndex<'_>,
    config: &GclConfig,
    tables: &mut DeviceTables<GclTable>,
) -> DeployResult<()> {
    for result in &index.snapshot().gcl_results {
        generate_for_port(index, config, result, tables)?;
    }
    Ok(())
}

#[instrument(skip_all, fields(device = result.device_id, interface = result.interface_id))]
fn generate_for_port(
    index: &TopologyIndex<'_>,
    config: &GclConfig,
    result: &GclResult,
    tables: &mut DeviceTables<GclTable>,
) -> DeployResult<()> {
    let device = index.device(result.device_id)?;
    if device.interface(result.interface_id).is_none() {
        return Err(DeployError::not_found(
            "interface",
            format!("{}/{}", result.device_id, result.interface_id),
        ));
    }
    if !device.capabilities.qbv {
        debug!("device has no 802.1Qbv support, skipping schedule");
        return Ok(());
    }

    let parameters = GateParameters::from_slots(
        &result.slots,
        device.capabilities.queue_count,
        config.admin_base_time,
    )?;
    debug!(cycle = %parameters.admin_cycle_time, entries = parameters.admin_control_list.len(), "built gate schedule");
    tables
        .entry(device.id)
        .insert_schedule(result.interface_id, parameters)
}
