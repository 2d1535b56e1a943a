//! 802.1Qbv gate parameters.
//!
//! Cycle times are exact rationals of nanoseconds over one second, so a
//! schedule round-trips without floating-point drift.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tsn_types::GateStateMask;

use crate::error::{DeployError, DeployResult};
use crate::topology::{GclSlot, InterfaceId};

pub const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// PTP timestamp used as the schedule's admin base time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PtpTime {
    pub seconds: u64,
    pub nanoseconds: u32,
}

impl PtpTime {
    pub const fn new(seconds: u64, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// Nanoseconds stay below one second.
    pub const fn is_normalized(&self) -> bool {
        self.nanoseconds < NANOS_PER_SECOND
    }
}

/// Seconds as `numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub const ZERO_SECONDS: Rational = Rational {
        numerator: 0,
        denominator: NANOS_PER_SECOND,
    };

    /// `nanos` nanoseconds. Fails when the count does not fit 32 bits.
    pub fn from_nanos(nanos: u64) -> DeployResult<Self> {
        let numerator = u32::try_from(nanos).map_err(|_| {
            DeployError::internal(format!("cycle time {nanos}ns does not fit 32 bits"))
        })?;
        Ok(Self {
            numerator,
            denominator: NANOS_PER_SECOND,
        })
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateOperation {
    #[default]
    SetGateStates,
}

/// One row of the admin control list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateControlEntry {
    #[serde(default)]
    pub operation: GateOperation,
    pub gate_states: GateStateMask,
    pub time_interval_ns: u32,
}

/// Gate configuration of one egress port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateParameters {
    pub gate_enabled: bool,
    /// Gate states while no list is running.
    pub admin_gate_states: GateStateMask,
    pub admin_base_time: PtpTime,
    pub admin_cycle_time: Rational,
    pub admin_control_list: Vec<GateControlEntry>,
}

impl GateParameters {
    /// Builds an enabled schedule from computed slots.
    ///
    /// Every slot must satisfy `start <= stop` with a duration that fits 32
    /// bits and a gate mask within the port's queues. The cycle time is the
    /// sum of the slot durations, so it always equals the list total.
    pub fn from_slots(
        slots: &[GclSlot],
        queue_count: u8,
        base_time: PtpTime,
    ) -> DeployResult<Self> {
        let admin_gate_states = GateStateMask::all_open(queue_count)?;
        if slots.is_empty() {
            return Err(DeployError::internal(
                "GCL result has no slots, refusing an enabled schedule with zero cycle",
            ));
        }

        let mut cycle_ns: u64 = 0;
        let mut admin_control_list = Vec::with_capacity(slots.len());
        for (i, slot) in slots.iter().enumerate() {
            let duration = slot.stop_ns.checked_sub(slot.start_ns).ok_or_else(|| {
                DeployError::internal(format!(
                    "GCL slot {} stops at {}ns before it starts at {}ns",
                    i, slot.stop_ns, slot.start_ns
                ))
            })?;
            let time_interval_ns = u32::try_from(duration).map_err(|_| {
                DeployError::internal(format!(
                    "GCL slot {i} lasts {duration}ns which does not fit 32 bits"
                ))
            })?;
            let gate_states = GateStateMask::checked(slot.gate_states, queue_count)?;
            cycle_ns = cycle_ns
                .checked_add(duration)
                .ok_or_else(|| DeployError::internal("GCL cycle time overflows"))?;
            admin_control_list.push(GateControlEntry {
                operation: GateOperation::SetGateStates,
                gate_states,
                time_interval_ns,
            });
        }

        Ok(Self {
            gate_enabled: true,
            admin_gate_states,
            admin_base_time: base_time,
            admin_cycle_time: Rational::from_nanos(cycle_ns)?,
            admin_control_list,
        })
    }

    /// A disabled port: all queues open, zero cycle, empty list.
    pub fn disabled(queue_count: u8, base_time: PtpTime) -> DeployResult<Self> {
        Ok(Self {
            gate_enabled: false,
            admin_gate_states: GateStateMask::all_open(queue_count)?,
            admin_base_time: base_time,
            admin_cycle_time: Rational::ZERO_SECONDS,
            admin_control_list: Vec::new(),
        })
    }

    /// Sum of the control list intervals.
    pub fn control_list_total_ns(&self) -> u64 {
        self.admin_control_list
            .iter()
            .map(|entry| u64::from(entry.time_interval_ns))
            .sum()
    }
}

/// Gate parameters of a device keyed by interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GclTable {
    ports: BTreeMap<InterfaceId, GateParameters>,
}

impl GclTable {
    /// Installs a computed schedule. A port gets at most one.
    pub fn insert_schedule(
        &mut self,
        port: InterfaceId,
        parameters: GateParameters,
    ) -> DeployResult<()> {
        if self.ports.contains_key(&port) {
            return Err(DeployError::internal(format!(
                "interface {port} already has a gate schedule"
            )));
        }
        self.ports.insert(port, parameters);
        Ok(())
    }

    /// Installs `parameters` unless the port already has any. First wins.
    pub fn insert_if_absent(&mut self, port: InterfaceId, parameters: GateParameters) -> bool {
        if self.ports.contains_key(&port) {
            return false;
        }
        self.ports.insert(port, parameters);
        true
    }

    pub fn get(&self, port: InterfaceId) -> Option<&GateParameters> {
        self.ports.get(&port)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InterfaceId, &GateParameters)> {
        self.ports.iter().map(|(port, parameters)| (*port, parameters))
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn slot(start_ns: u64, stop_ns: u64, gate_states: u8) -> GclSlot {
        GclSlot {
            start_ns,
            stop_ns,
            gate_states,
        }
    }

    #[test]
    fn test_cycle_equals_sum_of_intervals() {
        let slots = [slot(0, 250_000, 0x80), slot(250_000, 1_000_000, 0x7f)];
        let params = GateParameters::from_slots(&slots, 8, PtpTime::new(5, 0)).unwrap();

        assert!(params.gate_enabled);
        assert_eq!(params.admin_cycle_time.numerator, 1_000_000);
        assert_eq!(params.admin_cycle_time.denominator, NANOS_PER_SECOND);
        assert_eq!(
            params.control_list_total_ns(),
            u64::from(params.admin_cycle_time.numerator)
        );
        assert_eq!(params.admin_gate_states, GateStateMask::all_open(8).unwrap());
        assert_eq!(
            params
                .admin_control_list
                .iter()
                .map(|e| (e.gate_states.bits(), e.time_interval_ns))
                .collect::<Vec<_>>(),
            vec![(0x80, 250_000), (0x7f, 750_000)]
        );
        assert_eq!(params.admin_base_time, PtpTime::new(5, 0));
    }

    #[test]
    fn test_mask_beyond_queue_count_is_rejected() {
        let err = GateParameters::from_slots(&[slot(0, 10, 0x10)], 4, PtpTime::default())
            .unwrap_err();
        assert!(matches!(err, DeployError::Internal { .. }));
        assert!(GateParameters::from_slots(&[slot(0, 10, 0x0f)], 4, PtpTime::default()).is_ok());
    }

    #[test]
    fn test_invalid_slots_are_rejected() {
        let base = PtpTime::default();
        assert!(GateParameters::from_slots(&[], 8, base).is_err());
        assert!(GateParameters::from_slots(&[slot(10, 5, 1)], 8, base).is_err());
        assert!(GateParameters::from_slots(&[slot(0, 1 << 33, 1)], 8, base).is_err());
        assert!(GateParameters::from_slots(&[slot(0, 10, 1)], 0, base).is_err());
        assert!(GateParameters::from_slots(&[slot(0, 10, 1)], 9, base).is_err());

        // Each slot fits, their sum does not.
        let long = [slot(0, 3_000_000_000, 1), slot(0, 3_000_000_000, 2)];
        assert!(GateParameters::from_slots(&long, 8, base).is_err());
    }

    #[test]
    fn test_disabled_parameters() {
        let params = GateParameters::disabled(3, PtpTime::default()).unwrap();
        assert!(!params.gate_enabled);
        assert_eq!(params.admin_gate_states.bits(), 0b111);
        assert_eq!(params.admin_cycle_time, Rational::ZERO_SECONDS);
        assert!(params.admin_control_list.is_empty());
    }

    #[test]
    fn test_one_schedule_per_port() {
        let params = GateParameters::from_slots(&[slot(0, 100, 1)], 8, PtpTime::default()).unwrap();
        let mut table = GclTable::default();
        table.insert_schedule(2, params.clone()).unwrap();
        assert!(table.insert_schedule(2, params.clone()).is_err());
        assert!(!table.insert_if_absent(2, GateParameters::disabled(8, PtpTime::default()).unwrap()));
        assert_eq!(table.get(2), Some(&params));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_ptp_time_normalization() {
        assert!(PtpTime::new(1, 999_999_999).is_normalized());
        assert!(!PtpTime::new(1, NANOS_PER_SECOND).is_normalized());
        assert_eq!(Rational::from_nanos(1_500).unwrap().to_string(), "1500/1000000000");
    }
}
