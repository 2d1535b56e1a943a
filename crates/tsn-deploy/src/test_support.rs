//! Small canned snapshots for unit tests inside this crate.

use std::collections::BTreeMap;
use tsn_types::{Pcp, VlanId};

use crate::topology::{
    ApplicationSetting, Capabilities, Capability, Device, DeviceId, Interface, InterfaceId, Link,
    LinkId, RedundantPath, RoutingPath, RoutingResult, Snapshot, StreamMatch, StreamSetting,
    TagMode, TrafficDesign,
};

pub(crate) fn full_bridge() -> Capabilities {
    Capability::ALL
        .into_iter()
        .fold(Capabilities::default(), Capabilities::with)
}

pub(crate) fn end_station() -> Capabilities {
    Capabilities::default()
}

pub(crate) fn device(id: DeviceId, interfaces: u32, capabilities: Capabilities) -> Device {
    Device {
        id,
        name: format!("dev{id}"),
        interfaces: (1..=interfaces)
            .map(|i| Interface {
                id: i,
                name: format!("eth{i}"),
            })
            .collect(),
        capabilities,
    }
}

pub(crate) fn link(
    id: LinkId,
    (source_device, source_interface): (DeviceId, InterfaceId),
    (destination_device, destination_interface): (DeviceId, InterfaceId),
) -> Link {
    Link {
        id,
        source_device,
        source_interface,
        destination_device,
        destination_interface,
    }
}

pub(crate) fn redundant_path(devices: &[DeviceId], links: &[LinkId], vlan: u16) -> RedundantPath {
    RedundantPath {
        device_ids: devices.to_vec(),
        link_ids: links.to_vec(),
        vlan_id: VlanId::new(vlan).unwrap(),
    }
}

pub(crate) fn routing_result(
    stream_id: u32,
    vlan: u16,
    pcp: u8,
    paths: Vec<RedundantPath>,
) -> RoutingResult {
    RoutingResult {
        stream_id,
        vlan_id: VlanId::new(vlan).unwrap(),
        pcp: Pcp::new(pcp).unwrap(),
        multicast: false,
        cb: false,
        paths: vec![RoutingPath {
            redundant_paths: paths,
        }],
    }
}

pub(crate) fn stream_setting(destination_mac: &str, tag_mode: TagMode) -> StreamSetting {
    StreamSetting {
        destination_mac: destination_mac.parse().unwrap(),
        source_mac: None,
        tag_mode,
        source_ip: None,
        destination_ip: None,
    }
}

/// Talker 1, bridges 2 and 3, listener 4 in a row. Bridges use interface 1
/// toward the talker and 2 toward the listener.
///
/// Stream 1 runs the whole line tagged on VLAN 100 with PCP 5.
pub(crate) fn line_snapshot() -> Snapshot {
    Snapshot {
        devices: vec![
            device(1, 1, end_station()),
            device(2, 2, full_bridge()),
            device(3, 2, full_bridge()),
            device(4, 1, end_station()),
        ],
        links: vec![
            link(100, (1, 1), (2, 1)),
            link(101, (2, 2), (3, 1)),
            link(102, (3, 2), (4, 1)),
        ],
        routing_results: vec![routing_result(
            1,
            100,
            5,
            vec![redundant_path(&[1, 2, 3, 4], &[100, 101, 102], 100)],
        )],
        gcl_results: Vec::new(),
        traffic_design: TrafficDesign {
            stream_settings: BTreeMap::from([(
                1,
                stream_setting("AA:BB:CC:DD:EE:FF", TagMode::Tagged),
            )]),
            application_settings: BTreeMap::from([(
                1,
                ApplicationSetting {
                    stream_match: StreamMatch::Ethertype {
                        ethertype: 0x22f0,
                        subtype: None,
                    },
                },
            )]),
        },
    }
}

/// Talker 1 and listener 6 joined by two branches: 2-3-5 and 2-4-5.
///
/// Stream 2 is a CB stream with canonical VLAN 10; the branches use
/// VLANs 10 and 20.
pub(crate) fn diamond_snapshot() -> Snapshot {
    let mut result = routing_result(
        2,
        10,
        6,
        vec![
            redundant_path(&[1, 2, 3, 5, 6], &[200, 201, 203, 205], 10),
            redundant_path(&[1, 2, 4, 5, 6], &[200, 202, 204, 205], 20),
        ],
    );
    result.cb = true;

    let mut setting = stream_setting("00:1B:21:00:00:02", TagMode::Tagged);
    setting.source_mac = Some("00:1B:21:00:00:01".parse().unwrap());

    Snapshot {
        devices: vec![
            device(1, 1, end_station()),
            device(2, 3, full_bridge()),
            device(3, 2, full_bridge()),
            device(4, 2, full_bridge()),
            device(5, 3, full_bridge()),
            device(6, 1, end_station()),
        ],
        links: vec![
            link(200, (1, 1), (2, 1)),
            link(201, (2, 2), (3, 1)),
            link(202, (2, 3), (4, 1)),
            link(203, (3, 2), (5, 1)),
            link(204, (4, 2), (5, 2)),
            link(205, (5, 3), (6, 1)),
        ],
        routing_results: vec![result],
        gcl_results: Vec::new(),
        traffic_design: TrafficDesign {
            stream_settings: BTreeMap::from([(2, setting)]),
            application_settings: BTreeMap::new(),
        },
    }
}
