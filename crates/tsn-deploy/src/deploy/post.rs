//! Passes over the finished tables.

use tracing::debug;

use crate::config::GclConfig;
use crate::error::DeployResult;
use crate::tables::{
    CbTable, DefaultPriorityTable, DeployTables, DeviceTables, GateParameters, GclTable,
    PortVlanTable, StadConfigTable, StadPortTable, StaticForwardTable, TableFamily,
    VlanPortTypeTable, VlanStaticTable,
};
use crate::topology::TopologyIndex;

/// Port modes of every VLAN-capable device, from its final registrations.
pub(crate) fn derive_port_types(
    index: &TopologyIndex<'_>,
    vlan_static: &DeviceTables<VlanStaticTable>,
    port_types: &mut DeviceTables<VlanPortTypeTable>,
) {
    for device in index
        .devices()
        .filter(|device| device.capabilities.vlan_access_trunk)
    {
        *port_types.entry(device.id) = VlanPortTypeTable::derive(device, vlan_static.get(device.id));
    }
}

/// Gives every capable device a table of each family it supports, and every
/// interface of a Qbv device without a schedule disabled gate parameters.
pub(crate) fn fill_placeholders(
    index: &TopologyIndex<'_>,
    config: &GclConfig,
    tables: &mut DeployTables,
) -> DeployResult<()> {
    for device in index.devices() {
        for family in TableFamily::ALL {
            if !family.capabilities().iter().any(|cap| device.supports(*cap)) {
                continue;
            }
            let id = device.id;
            let added = match family {
                TableFamily::Gcl => tables.gcl.insert_if_absent(id, GclTable::default()),
                TableFamily::VlanStatic => tables
                    .vlan_static
                    .insert_if_absent(id, VlanStaticTable::default()),
                TableFamily::VlanPortType => tables
                    .vlan_port_type
                    .insert_if_absent(id, VlanPortTypeTable::default()),
                TableFamily::StaticForwardUnicast => tables
                    .static_forward_unicast
                    .insert_if_absent(id, StaticForwardTable::default()),
                TableFamily::StaticForwardMulticast => tables
                    .static_forward_multicast
                    .insert_if_absent(id, StaticForwardTable::default()),
                TableFamily::PortVlan => tables.port_vlan.insert_if_absent(id, PortVlanTable::default()),
                TableFamily::DefaultPriority => tables
                    .default_priority
                    .insert_if_absent(id, DefaultPriorityTable::default()),
                TableFamily::StadPort => tables.stad_port.insert_if_absent(id, StadPortTable::default()),
                TableFamily::StadConfig => tables
                    .stad_config
                    .insert_if_absent(id, StadConfigTable::default()),
                TableFamily::Cb => tables.cb.insert_if_absent(id, CbTable::default()),
            };
            if added {
                debug!(device = id, %family, "added placeholder table");
            }
        }

        if device.capabilities.qbv {
            let disabled =
                GateParameters::disabled(device.capabilities.queue_count, config.admin_base_time)?;
            let gcl = tables.gcl.entry(device.id);
            for interface in &device.interfaces {
                gcl.insert_if_absent(interface.id, disabled.clone());
            }
        }
    }
    Ok(())
}
