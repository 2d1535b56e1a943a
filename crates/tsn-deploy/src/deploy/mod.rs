//! The deployment table generator.
//!
//! [`DeployPathData`] owns the tables of one deployment cycle and runs the
//! per-family generators in dependency order:
//!
//! 1. gate control lists
//! 2. VLAN static registrations
//! 3. static forwarding entries
//! 4. port VLAN and default priority
//! 5. stream priority classification
//! 6. FRER
//! 7. port types and placeholders
//!
//! Each family is built on a staged copy and committed only when its
//! generator succeeds, so an error leaves every earlier family in place and
//! the failing one untouched.

mod forward;
mod frer;
mod gcl;
mod post;
mod pvid;
mod stad;
mod vlan;

pub use frer::{FrerHandles, StreamHandleAllocator};

use tracing::{info, instrument};
use tsn_types::{Pcp, VlanId};

use crate::config::DeployConfig;
use crate::error::{DeployError, DeployResult};
use crate::tables::{DeployTables, StreamHandle, TableFamily};
use crate::topology::{DeviceId, InterfaceId, Snapshot, TopologyIndex};

use forward::ForwardTables;
use pvid::PortDefaultTables;
use stad::StreamPriorityTables;

/// Generates per-device configuration tables for one topology snapshot.
pub struct DeployPathData<'a> {
    index: TopologyIndex<'a>,
    config: DeployConfig,
    handles: StreamHandleAllocator,
    tables: DeployTables,
    generated: bool,
}

impl<'a> DeployPathData<'a> {
    /// Validates `config` and indexes `snapshot`.
    pub fn new(snapshot: &'a Snapshot, config: DeployConfig) -> DeployResult<Self> {
        config.validate()?;
        let index = TopologyIndex::new(snapshot)?;
        Ok(Self {
            index,
            handles: StreamHandleAllocator::new(config.frer.first_stream_handle),
            config,
            tables: DeployTables::default(),
            generated: false,
        })
    }

    /// Runs every generator once.
    #[instrument(skip(self))]
    pub fn generate_data(&mut self) -> DeployResult<()> {
        if self.generated {
            return Err(DeployError::bad_request(
                "tables were already generated for this snapshot",
            ));
        }
        self.generated = true;

        let snapshot = self.index.snapshot();
        info!(
            "Generating deployment tables for {} devices, {} routing results, {} GCL results",
            snapshot.devices.len(),
            snapshot.routing_results.len(),
            snapshot.gcl_results.len()
        );

        self.generate_gcl_tables()?;
        self.generate_vlan_static_tables()?;
        self.generate_static_forward_tables()?;
        self.generate_port_vlan_tables()?;
        self.generate_stream_priority_tables()?;
        self.generate_cb_tables()?;
        self.post_process()?;

        for family in TableFamily::ALL {
            info!(
                "{}: {} devices",
                family,
                self.tables.device_count(family)
            );
        }
        Ok(())
    }

    fn generate_gcl_tables(&mut self) -> DeployResult<()> {
        let mut staged = self.tables.gcl.clone();
        gcl::generate(&self.index, &self.config.gcl, &mut staged)?;
        self.tables.gcl = staged;
        Ok(())
    }

    fn generate_vlan_static_tables(&mut self) -> DeployResult<()> {
        let mut staged = self.tables.vlan_static.clone();
        vlan::generate(&self.index, &mut staged)?;
        self.tables.vlan_static = staged;
        Ok(())
    }

    fn generate_static_forward_tables(&mut self) -> DeployResult<()> {
        let mut unicast = self.tables.static_forward_unicast.clone();
        let mut multicast = self.tables.static_forward_multicast.clone();
        forward::generate(
            &self.index,
            ForwardTables {
                unicast: &mut unicast,
                multicast: &mut multicast,
            },
        )?;
        self.tables.static_forward_unicast = unicast;
        self.tables.static_forward_multicast = multicast;
        Ok(())
    }

    fn generate_port_vlan_tables(&mut self) -> DeployResult<()> {
        let mut port_vlan = self.tables.port_vlan.clone();
        let mut default_priority = self.tables.default_priority.clone();
        pvid::generate(
            &self.index,
            PortDefaultTables {
                port_vlan: &mut port_vlan,
                default_priority: &mut default_priority,
            },
        )?;
        self.tables.port_vlan = port_vlan;
        self.tables.default_priority = default_priority;
        Ok(())
    }

    fn generate_stream_priority_tables(&mut self) -> DeployResult<()> {
        let mut ports = self.tables.stad_port.clone();
        let mut configs = self.tables.stad_config.clone();
        stad::generate(
            &self.index,
            StreamPriorityTables {
                ports: &mut ports,
                configs: &mut configs,
            },
        )?;
        self.tables.stad_port = ports;
        self.tables.stad_config = configs;
        Ok(())
    }

    fn generate_cb_tables(&mut self) -> DeployResult<()> {
        let mut staged = self.tables.cb.clone();
        let mut handles = self.handles.clone();
        frer::generate(&self.index, &self.config.frer, &mut handles, &mut staged)?;
        self.tables.cb = staged;
        self.handles = handles;
        Ok(())
    }

    fn post_process(&mut self) -> DeployResult<()> {
        post::derive_port_types(
            &self.index,
            &self.tables.vlan_static,
            &mut self.tables.vlan_port_type,
        );
        if self.config.fill_placeholders {
            let mut staged = self.tables.clone();
            post::fill_placeholders(&self.index, &self.config.gcl, &mut staged)?;
            self.tables = staged;
        }
        Ok(())
    }

    fn ensure_port(&self, device: DeviceId, port: InterfaceId) -> DeployResult<()> {
        match self.index.device(device)?.interface(port) {
            Some(_) => Ok(()),
            None => Err(DeployError::not_found(
                "interface",
                format!("{device}/{port}"),
            )),
        }
    }

    /// Adds `port` to `vlan` on `device` with the VLAN table's merge rule:
    /// membership only grows and the untag bit follows the latest write.
    pub fn set_vlan_static_entry(
        &mut self,
        device: DeviceId,
        port: InterfaceId,
        priority: Pcp,
        vlan: VlanId,
        untag: bool,
        te_mstid: bool,
    ) -> DeployResult<()> {
        self.ensure_port(device, port)?;
        self.tables
            .vlan_static
            .entry(device)
            .set_entry(port, priority, vlan, untag, te_mstid);
        Ok(())
    }

    /// Sets the PVID of a port; a different existing value is an error.
    pub fn set_port_vlan(
        &mut self,
        device: DeviceId,
        port: InterfaceId,
        vlan: VlanId,
    ) -> DeployResult<()> {
        self.ensure_port(device, port)?;
        pvid::write_port_vlan(&mut self.tables.port_vlan, device, port, vlan)
    }

    /// Sets the default PCP of a port; a different existing value is an
    /// error.
    pub fn set_default_priority(
        &mut self,
        device: DeviceId,
        port: InterfaceId,
        pcp: Pcp,
    ) -> DeployResult<()> {
        self.ensure_port(device, port)?;
        pvid::write_default_priority(&mut self.tables.default_priority, device, port, pcp)
    }

    pub fn tables(&self) -> &DeployTables {
        &self.tables
    }

    pub fn into_tables(self) -> DeployTables {
        self.tables
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// First handle a further CB stream would get.
    pub fn next_stream_handle(&self) -> StreamHandle {
        self.handles.peek()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{diamond_snapshot, line_snapshot};
    use crate::topology::{GclResult, GclSlot, TagMode};
    use pretty_assertions::assert_eq;

    fn vlan(id: u16) -> VlanId {
        VlanId::new(id).unwrap()
    }

    #[test]
    fn test_generate_line() {
        let snapshot = line_snapshot();
        let mut deploy = DeployPathData::new(&snapshot, DeployConfig::default()).unwrap();
        deploy.generate_data().unwrap();

        let tables = deploy.tables();
        assert!(tables.vlan_static.get(2).unwrap().entry(vlan(100)).is_some());
        assert_eq!(tables.static_forward_unicast.len(), 2);
        // Placeholders for every family on both bridges.
        for family in TableFamily::ALL {
            assert_eq!(tables.device_count(family), 2, "{family}");
        }
        assert!(tables.cb.get(2).unwrap().is_empty());
    }

    #[test]
    fn test_fresh_instances_are_identical() {
        let snapshot = diamond_snapshot();
        let run = || {
            let mut deploy = DeployPathData::new(&snapshot, DeployConfig::default()).unwrap();
            deploy.generate_data().unwrap();
            deploy.into_tables()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_generate_twice_is_rejected() {
        let snapshot = line_snapshot();
        let mut deploy = DeployPathData::new(&snapshot, DeployConfig::default()).unwrap();
        deploy.generate_data().unwrap();
        let err = deploy.generate_data().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_failing_family_keeps_earlier_ones() {
        let mut snapshot = line_snapshot();
        snapshot.gcl_results.push(GclResult {
            device_id: 2,
            interface_id: 2,
            slots: vec![GclSlot {
                start_ns: 0,
                stop_ns: 1_000,
                gate_states: 0xff,
            }],
        });
        snapshot.traffic_design.stream_settings.get_mut(&1).unwrap().tag_mode =
            TagMode::UntaggedPvid;
        for device in &mut snapshot.devices {
            device.capabilities.default_pvid = false;
        }

        let mut deploy = DeployPathData::new(&snapshot, DeployConfig::default()).unwrap();
        deploy.set_port_vlan(3, 1, vlan(100)).unwrap();
        let err = deploy.generate_data().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalError);

        let tables = deploy.tables();
        assert!(tables.gcl.get(2).unwrap().get(2).unwrap().gate_enabled);
        assert!(tables.vlan_static.contains(3));
        assert_eq!(tables.static_forward_unicast.len(), 2);
        assert_eq!(tables.port_vlan.len(), 1);
        assert!(tables.default_priority.is_empty());
        assert!(tables.cb.is_empty());
        assert!(tables.vlan_port_type.is_empty());
    }

    #[test]
    fn test_direct_merge_operations() {
        let snapshot = line_snapshot();
        let mut deploy = DeployPathData::new(&snapshot, DeployConfig::default()).unwrap();
        let pcp = Pcp::new(2).unwrap();

        deploy.set_vlan_static_entry(2, 1, pcp, vlan(10), true, false).unwrap();
        deploy.set_vlan_static_entry(2, 1, pcp, vlan(10), true, false).unwrap();
        let entry = deploy.tables().vlan_static.get(2).unwrap().entry(vlan(10)).unwrap().clone();
        assert!(entry.is_untagged(1));

        deploy.set_port_vlan(2, 1, vlan(5)).unwrap();
        let err = deploy.set_port_vlan(2, 1, vlan(7)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalError);
        assert_eq!(deploy.tables().port_vlan.get(2).unwrap().pvid(1), Some(vlan(5)));

        deploy.set_default_priority(2, 1, pcp).unwrap();
        assert!(deploy.set_default_priority(2, 1, Pcp::new(3).unwrap()).is_err());

        let err = deploy.set_port_vlan(9, 1, vlan(5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = deploy.set_port_vlan(2, 9, vlan(5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let snapshot = line_snapshot();
        let mut config = DeployConfig::default();
        config.frer.history_length = 200;
        let err = DeployPathData::new(&snapshot, config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_handles_follow_config() {
        let snapshot = diamond_snapshot();
        let mut config = DeployConfig::default();
        config.frer.first_stream_handle = 40;
        let mut deploy = DeployPathData::new(&snapshot, config).unwrap();
        deploy.generate_data().unwrap();
        assert_eq!(deploy.next_stream_handle(), 43);
        assert_eq!(deploy.config().frer.first_stream_handle, 40);
        assert_eq!(deploy.tables().cb.get(2).unwrap().sequence_generations[0].handles.len(), 1);
    }

    #[test]
    fn test_placeholders_can_be_disabled() {
        let snapshot = line_snapshot();
        let config = DeployConfig {
            fill_placeholders: false,
            ..DeployConfig::default()
        };
        let mut deploy = DeployPathData::new(&snapshot, config).unwrap();
        deploy.generate_data().unwrap();
        let tables = deploy.tables();
        assert!(tables.cb.is_empty());
        assert!(tables.gcl.is_empty());
        assert_eq!(tables.vlan_port_type.len(), 2);
    }
}
