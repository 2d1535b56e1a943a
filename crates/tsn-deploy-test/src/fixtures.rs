//! Test fixtures for deployment scenarios
//!
//! Builders panic on out-of-range literals (VLAN ids, PCPs, MAC strings):
//! fixtures are written by hand and a bad literal is a broken test.

use tsn_deploy::topology::{
    ApplicationSetting, Capabilities, Capability, Device, DeviceId, GclResult, GclSlot, Interface,
    InterfaceId, Link, LinkId, RedundantPath, RoutingPath, RoutingResult, Snapshot, StreamId,
    StreamMatch, StreamSetting, TagMode,
};
use tsn_types::{MacAddress, Pcp, VlanId};

pub fn vlan(id: u16) -> VlanId {
    VlanId::new(id).expect("fixture VLAN id out of range")
}

pub fn pcp(value: u8) -> Pcp {
    Pcp::new(value).expect("fixture PCP out of range")
}

pub fn mac(text: &str) -> MacAddress {
    text.parse().expect("fixture MAC address malformed")
}

/// Common device capability presets
pub mod capability_fixtures {
    use super::*;

    /// No configurable feature at all
    pub fn end_station() -> Capabilities {
        Capabilities::default()
    }

    /// Access/trunk VLANs and unicast/multicast static forwarding
    pub fn bridge() -> Capabilities {
        Capabilities::default()
            .with(Capability::VlanAccessTrunk)
            .with(Capability::StaticForwardUnicast)
            .with(Capability::StaticForwardMulticast)
    }

    /// Bridge that can untag through hybrid VLAN membership
    pub fn hybrid_bridge() -> Capabilities {
        bridge().with(Capability::VlanHybrid)
    }

    /// Hybrid bridge with 802.1CB
    pub fn cb_bridge() -> Capabilities {
        hybrid_bridge().with(Capability::Cb)
    }

    /// Bridge with 802.1Qbv and the given number of queues
    pub fn qbv_bridge(queue_count: u8) -> Capabilities {
        Capabilities {
            queue_count,
            ..bridge().with(Capability::Qbv)
        }
    }

    /// Every capability
    pub fn full_bridge() -> Capabilities {
        Capability::ALL
            .into_iter()
            .fold(Capabilities::default(), Capabilities::with)
    }
}

/// Stream setting for `destination_mac` with no source MAC or IPs
pub fn stream_setting(destination_mac: &str, tag_mode: TagMode) -> StreamSetting {
    StreamSetting {
        destination_mac: mac(destination_mac),
        source_mac: None,
        tag_mode,
        source_ip: None,
        destination_ip: None,
    }
}

/// Builds a [`Snapshot`] device by device and link by link.
#[derive(Debug, Clone, Default)]
pub struct TopologyBuilder {
    snapshot: Snapshot,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a device with interfaces `1..=interfaces` named `eth<N>`
    pub fn device(
        mut self,
        id: DeviceId,
        name: impl Into<String>,
        interfaces: u32,
        capabilities: Capabilities,
    ) -> Self {
        self.snapshot.devices.push(Device {
            id,
            name: name.into(),
            interfaces: (1..=interfaces)
                .map(|i| Interface {
                    id: i,
                    name: format!("eth{i}"),
                })
                .collect(),
            capabilities,
        });
        self
    }

    /// Adds a link from `source` to `destination`, each a (device, interface)
    pub fn connect(
        mut self,
        id: LinkId,
        source: (DeviceId, InterfaceId),
        destination: (DeviceId, InterfaceId),
    ) -> Self {
        self.snapshot.links.push(Link {
            id,
            source_device: source.0,
            source_interface: source.1,
            destination_device: destination.0,
            destination_interface: destination.1,
        });
        self
    }

    pub fn stream(mut self, id: StreamId, setting: StreamSetting) -> Self {
        self.snapshot
            .traffic_design
            .stream_settings
            .insert(id, setting);
        self
    }

    pub fn application(mut self, id: StreamId, stream_match: StreamMatch) -> Self {
        self.snapshot
            .traffic_design
            .application_settings
            .insert(id, ApplicationSetting { stream_match });
        self
    }

    pub fn routing(mut self, result: RoutingResult) -> Self {
        self.snapshot.routing_results.push(result);
        self
    }

    /// Adds a gate schedule from (start, stop, gate states) triples
    pub fn gcl(mut self, device_id: DeviceId, interface_id: InterfaceId, slots: &[(u64, u64, u8)]) -> Self {
        self.snapshot.gcl_results.push(GclResult {
            device_id,
            interface_id,
            slots: slots
                .iter()
                .map(|&(start_ns, stop_ns, gate_states)| GclSlot {
                    start_ns,
                    stop_ns,
                    gate_states,
                })
                .collect(),
        });
        self
    }

    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}

/// Builds a [`RoutingResult`]; redundant paths go into the current routing
/// path until [`RoutingResultBuilder::next_routing_path`] opens a new one.
#[derive(Debug, Clone)]
pub struct RoutingResultBuilder {
    result: RoutingResult,
}

impl RoutingResultBuilder {
    pub fn new(stream_id: StreamId, canonical_vlan: u16, priority: u8) -> Self {
        Self {
            result: RoutingResult {
                stream_id,
                vlan_id: vlan(canonical_vlan),
                pcp: pcp(priority),
                multicast: false,
                cb: false,
                paths: vec![RoutingPath {
                    redundant_paths: Vec::new(),
                }],
            },
        }
    }

    pub fn multicast(mut self) -> Self {
        self.result.multicast = true;
        self
    }

    pub fn cb(mut self) -> Self {
        self.result.cb = true;
        self
    }

    pub fn path(mut self, devices: &[DeviceId], links: &[LinkId], path_vlan: u16) -> Self {
        let path = RedundantPath {
            device_ids: devices.to_vec(),
            link_ids: links.to_vec(),
            vlan_id: vlan(path_vlan),
        };
        if let Some(current) = self.result.paths.last_mut() {
            current.redundant_paths.push(path);
        }
        self
    }

    pub fn next_routing_path(mut self) -> Self {
        self.result.paths.push(RoutingPath {
            redundant_paths: Vec::new(),
        });
        self
    }

    pub fn build(self) -> RoutingResult {
        self.result
    }
}

/// Canned scenarios
pub mod scenarios {
    use super::capability_fixtures::*;
    use super::*;

    pub const LINE_TALKER: DeviceId = 1;
    pub const LINE_B: DeviceId = 2;
    pub const LINE_C: DeviceId = 3;
    pub const LINE_LISTENER: DeviceId = 4;
    pub const LINE_STREAM: StreamId = 1;
    pub const LINE_MAC: &str = "AA:BB:CC:DD:EE:FF";

    /// Talker A, hybrid bridges B and C, listener. Bridges use interface 1
    /// toward the talker and 2 toward the listener; stream 1 runs VLAN 100
    /// with PCP 3.
    pub fn line(tag_mode: TagMode) -> TopologyBuilder {
        TopologyBuilder::new()
            .device(LINE_TALKER, "A", 1, end_station())
            .device(LINE_B, "B", 2, hybrid_bridge())
            .device(LINE_C, "C", 2, hybrid_bridge())
            .device(LINE_LISTENER, "listener", 1, end_station())
            .connect(10, (LINE_TALKER, 1), (LINE_B, 1))
            .connect(11, (LINE_B, 2), (LINE_C, 1))
            .connect(12, (LINE_LISTENER, 1), (LINE_C, 2))
            .stream(LINE_STREAM, stream_setting(LINE_MAC, tag_mode))
            .routing(
                RoutingResultBuilder::new(LINE_STREAM, 100, 3)
                    .path(&[LINE_TALKER, LINE_B, LINE_C, LINE_LISTENER], &[10, 11, 12], 100)
                    .build(),
            )
    }

    pub const DIAMOND_TALKER: DeviceId = 1;
    pub const DIAMOND_SPLIT: DeviceId = 2;
    pub const DIAMOND_UPPER: DeviceId = 3;
    pub const DIAMOND_LOWER: DeviceId = 4;
    pub const DIAMOND_MERGE: DeviceId = 5;
    pub const DIAMOND_LISTENER: DeviceId = 6;
    pub const DIAMOND_STREAM: StreamId = 7;
    pub const DIAMOND_MAC: &str = "00:1B:21:3C:4D:5E";

    /// A CB stream from talker 1 to listener 6 over the branches 2-3-5
    /// (VLAN 10, canonical) and 2-4-5 (VLAN 20). Link 0 joins the talker
    /// to the split bridge.
    pub fn frer_diamond() -> TopologyBuilder {
        TopologyBuilder::new()
            .device(DIAMOND_TALKER, "talker", 1, end_station())
            .device(DIAMOND_SPLIT, "split", 3, cb_bridge())
            .device(DIAMOND_UPPER, "upper", 2, cb_bridge())
            .device(DIAMOND_LOWER, "lower", 2, cb_bridge())
            .device(DIAMOND_MERGE, "merge", 3, cb_bridge())
            .device(DIAMOND_LISTENER, "listener", 1, end_station())
            .connect(0, (DIAMOND_TALKER, 1), (DIAMOND_SPLIT, 1))
            .connect(1, (DIAMOND_SPLIT, 2), (DIAMOND_UPPER, 1))
            .connect(2, (DIAMOND_SPLIT, 3), (DIAMOND_LOWER, 1))
            .connect(3, (DIAMOND_UPPER, 2), (DIAMOND_MERGE, 1))
            .connect(4, (DIAMOND_LOWER, 2), (DIAMOND_MERGE, 2))
            .connect(5, (DIAMOND_MERGE, 3), (DIAMOND_LISTENER, 1))
            .stream(
                DIAMOND_STREAM,
                stream_setting(DIAMOND_MAC, TagMode::Tagged),
            )
            .routing(
                RoutingResultBuilder::new(DIAMOND_STREAM, 10, 6)
                    .cb()
                    .path(
                        &[DIAMOND_TALKER, DIAMOND_SPLIT, DIAMOND_UPPER, DIAMOND_MERGE, DIAMOND_LISTENER],
                        &[0, 1, 3, 5],
                        10,
                    )
                    .path(
                        &[DIAMOND_TALKER, DIAMOND_SPLIT, DIAMOND_LOWER, DIAMOND_MERGE, DIAMOND_LISTENER],
                        &[0, 2, 4, 5],
                        20,
                    )
                    .build(),
            )
    }
}
