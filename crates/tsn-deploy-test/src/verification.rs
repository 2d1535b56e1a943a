//! Verification helpers for generated deployment tables
//!
//! Each check returns a [`VerifyResult`] naming the table, device and
//! entry that failed, so scenario tests read as a list of expectations.

use thiserror::Error;
use tsn_deploy::tables::{RecoveryAlgorithm, StreamIdentification};
use tsn_deploy::topology::{DeviceId, InterfaceId};
use tsn_deploy::{DeployTables, TableFamily};
use tsn_types::{MacAddress, VlanId, VlanPortType};

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("{family} has no table for device {device}")]
    TableNotFound { family: TableFamily, device: DeviceId },

    #[error("{family} of device {device} has no {entry}")]
    EntryNotFound {
        family: TableFamily,
        device: DeviceId,
        entry: String,
    },

    #[error("{family} of device {device}, {entry}: expected {expected}, got {actual}")]
    ValueMismatch {
        family: TableFamily,
        device: DeviceId,
        entry: String,
        expected: String,
        actual: String,
    },

    #[error("Expected {expected} devices with {family}, found {actual}")]
    DeviceCountMismatch {
        family: TableFamily,
        expected: usize,
        actual: usize,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

fn mismatch(
    family: TableFamily,
    device: DeviceId,
    entry: impl Into<String>,
    expected: impl ToString,
    actual: impl ToString,
) -> VerificationError {
    VerificationError::ValueMismatch {
        family,
        device,
        entry: entry.into(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

/// Deployment table verification helper
pub struct TableVerifier<'a> {
    tables: &'a DeployTables,
}

impl<'a> TableVerifier<'a> {
    pub fn new(tables: &'a DeployTables) -> Self {
        Self { tables }
    }

    fn table<T>(
        family: TableFamily,
        device: DeviceId,
        table: Option<&'a T>,
    ) -> VerifyResult<&'a T> {
        table.ok_or(VerificationError::TableNotFound { family, device })
    }

    /// Verify `port` is a member of `vlan` with the given tagging
    pub fn assert_vlan_member(
        &self,
        device: DeviceId,
        vlan: VlanId,
        port: InterfaceId,
        untagged: bool,
    ) -> VerifyResult<()> {
        let family = TableFamily::VlanStatic;
        let table = Self::table(family, device, self.tables.vlan_static.get(device))?;
        let entry = table.entry(vlan).ok_or_else(|| VerificationError::EntryNotFound {
            family,
            device,
            entry: format!("VLAN {vlan}"),
        })?;
        if !entry.is_member(port) {
            return Err(mismatch(family, device, format!("VLAN {vlan} port {port}"), "member", "not a member"));
        }
        if entry.is_untagged(port) != untagged {
            let tagging = |untag: bool| if untag { "untagged" } else { "tagged" };
            return Err(mismatch(
                family,
                device,
                format!("VLAN {vlan} port {port}"),
                tagging(untagged),
                tagging(entry.is_untagged(port)),
            ));
        }
        Ok(())
    }

    /// Verify the forwarding ports of (`vlan`, `mac`)
    pub fn assert_forward_ports(
        &self,
        device: DeviceId,
        multicast: bool,
        vlan: VlanId,
        mac: MacAddress,
        ports: &[InterfaceId],
    ) -> VerifyResult<()> {
        let (family, tables) = if multicast {
            (TableFamily::StaticForwardMulticast, &self.tables.static_forward_multicast)
        } else {
            (TableFamily::StaticForwardUnicast, &self.tables.static_forward_unicast)
        };
        let table = Self::table(family, device, tables.get(device))?;
        let entry = table.entry(vlan, mac).ok_or_else(|| VerificationError::EntryNotFound {
            family,
            device,
            entry: format!("entry for VLAN {vlan} / {mac}"),
        })?;
        let actual: Vec<InterfaceId> = entry.ports.iter().copied().collect();
        if actual != ports {
            return Err(mismatch(
                family,
                device,
                format!("ports of VLAN {vlan} / {mac}"),
                format!("{ports:?}"),
                format!("{actual:?}"),
            ));
        }
        Ok(())
    }

    pub fn assert_pvid(&self, device: DeviceId, port: InterfaceId, vlan: VlanId) -> VerifyResult<()> {
        let family = TableFamily::PortVlan;
        let table = Self::table(family, device, self.tables.port_vlan.get(device))?;
        match table.pvid(port) {
            Some(actual) if actual == vlan => Ok(()),
            Some(actual) => Err(mismatch(family, device, format!("PVID of port {port}"), vlan, actual)),
            None => Err(VerificationError::EntryNotFound {
                family,
                device,
                entry: format!("PVID for port {port}"),
            }),
        }
    }

    pub fn assert_port_type(
        &self,
        device: DeviceId,
        port: InterfaceId,
        expected: VlanPortType,
    ) -> VerifyResult<()> {
        let family = TableFamily::VlanPortType;
        let table = Self::table(family, device, self.tables.vlan_port_type.get(device))?;
        match table.get(port) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(mismatch(family, device, format!("port {port}"), expected, actual)),
            None => Err(VerificationError::EntryNotFound {
                family,
                device,
                entry: format!("port {port}"),
            }),
        }
    }

    /// Verify the schedule on `port` is enabled and its cycle time equals
    /// the sum of its intervals
    pub fn assert_gcl_consistent(&self, device: DeviceId, port: InterfaceId) -> VerifyResult<()> {
        let family = TableFamily::Gcl;
        let table = Self::table(family, device, self.tables.gcl.get(device))?;
        let params = table.get(port).ok_or_else(|| VerificationError::EntryNotFound {
            family,
            device,
            entry: format!("gate parameters for port {port}"),
        })?;
        if !params.gate_enabled {
            return Err(mismatch(family, device, format!("port {port} gate_enabled"), true, false));
        }
        let total = params.control_list_total_ns();
        let cycle = u64::from(params.admin_cycle_time.numerator);
        if total != cycle {
            return Err(mismatch(family, device, format!("port {port} cycle time"), total, cycle));
        }
        Ok(())
    }

    /// Verify no (port, handle) pair is recovered by two entries
    pub fn assert_recovery_unique(&self, device: DeviceId) -> VerifyResult<()> {
        let family = TableFamily::Cb;
        let table = Self::table(family, device, self.tables.cb.get(device))?;
        for entry in &table.sequence_recoveries {
            for &port in &entry.ports {
                for &handle in &entry.handles {
                    let count = table.recoveries_covering(port, handle);
                    if count != 1 {
                        return Err(mismatch(
                            family,
                            device,
                            format!("recoveries of port {port} handle {handle}"),
                            1,
                            count,
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of active destination MAC/VLAN identities (branch entries)
    pub fn split_identity_count(&self, device: DeviceId) -> VerifyResult<usize> {
        let table = Self::table(TableFamily::Cb, device, self.tables.cb.get(device))?;
        Ok(table
            .stream_identities
            .iter()
            .filter(|e| matches!(e.identification, StreamIdentification::DestinationMacVlan { .. }))
            .count())
    }

    /// Number of recovery entries using `algorithm`
    pub fn recovery_count(&self, device: DeviceId, algorithm: RecoveryAlgorithm) -> VerifyResult<usize> {
        let table = Self::table(TableFamily::Cb, device, self.tables.cb.get(device))?;
        Ok(table
            .sequence_recoveries
            .iter()
            .filter(|e| e.algorithm == algorithm)
            .count())
    }

    pub fn assert_device_count(&self, family: TableFamily, expected: usize) -> VerifyResult<()> {
        let actual = self.tables.device_count(family);
        if actual != expected {
            return Err(VerificationError::DeviceCountMismatch {
                family,
                expected,
                actual,
            });
        }
        Ok(())
    }
}
