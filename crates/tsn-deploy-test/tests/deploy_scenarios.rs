//! End-to-end deployment scenarios
//!
//! Each test builds a snapshot, runs the full generator and checks the
//! resulting tables through the verifier.

use pretty_assertions::assert_eq;
use std::io::Write;
use tsn_deploy::tables::RecoveryAlgorithm;
use tsn_deploy::topology::{Capability, StreamMatch, TagMode, TransportProtocol};
use tsn_deploy::{DeployConfig, DeployPathData, DeployTables, ErrorKind, Snapshot, TableFamily};
use tsn_deploy_test::{
    capability_fixtures, init_test_tracing, mac, scenarios, stream_setting, vlan,
    RoutingResultBuilder, TableVerifier, TopologyBuilder,
};
use tsn_types::VlanPortType;

fn generate(snapshot: &Snapshot) -> DeployTables {
    let mut deploy = DeployPathData::new(snapshot, DeployConfig::default())
        .expect("snapshot should index");
    deploy.generate_data().expect("generation should succeed");
    deploy.into_tables()
}

/// Untagged stream over two hybrid bridges
///
/// Scenario:
/// 1. A sends untagged frames; B assigns VLAN 100 through its PVID
/// 2. B and C carry the stream tagged
/// 3. C strips the tag toward the listener
#[test]
fn test_untagged_line_end_to_end() {
    init_test_tracing();
    let mut snapshot = scenarios::line(TagMode::UntaggedPvid).build();
    snapshot.devices[1].capabilities = snapshot.devices[1]
        .capabilities
        .clone()
        .with(Capability::DefaultPvid);
    let tables = generate(&snapshot);
    let verifier = TableVerifier::new(&tables);
    let dmac = mac(scenarios::LINE_MAC);

    verifier.assert_vlan_member(scenarios::LINE_B, vlan(100), 1, false).unwrap();
    verifier.assert_vlan_member(scenarios::LINE_B, vlan(100), 2, false).unwrap();
    verifier.assert_vlan_member(scenarios::LINE_C, vlan(100), 1, false).unwrap();
    verifier.assert_vlan_member(scenarios::LINE_C, vlan(100), 2, true).unwrap();

    verifier
        .assert_forward_ports(scenarios::LINE_B, false, vlan(100), dmac, &[2])
        .unwrap();
    verifier
        .assert_forward_ports(scenarios::LINE_C, false, vlan(100), dmac, &[2])
        .unwrap();

    verifier.assert_pvid(scenarios::LINE_B, 1, vlan(100)).unwrap();
    verifier.assert_port_type(scenarios::LINE_B, 1, VlanPortType::Trunk).unwrap();
    verifier.assert_port_type(scenarios::LINE_C, 2, VlanPortType::Hybrid).unwrap();

    assert!(!tables.vlan_static.contains(scenarios::LINE_TALKER));
    assert!(!tables.vlan_static.contains(scenarios::LINE_LISTENER));
}

#[test]
fn test_tagged_line_stays_tagged() {
    init_test_tracing();
    let tables = generate(&scenarios::line(TagMode::Tagged).build());
    let verifier = TableVerifier::new(&tables);

    verifier.assert_vlan_member(scenarios::LINE_C, vlan(100), 2, false).unwrap();
    verifier.assert_port_type(scenarios::LINE_C, 2, VlanPortType::Trunk).unwrap();
    assert!(tables.port_vlan.get(scenarios::LINE_B).is_none());
}

/// Two-branch FRER diamond
///
/// Scenario:
/// 1. The split bridge replicates onto the VLAN 20 branch
/// 2. The merge bridge eliminates duplicates with the vector algorithm
/// 3. No egress port recovers a stream handle twice
#[test]
fn test_frer_diamond() {
    init_test_tracing();
    let tables = generate(&scenarios::frer_diamond().build());
    let verifier = TableVerifier::new(&tables);

    assert_eq!(verifier.split_identity_count(scenarios::DIAMOND_SPLIT).unwrap(), 1);
    assert_eq!(
        verifier
            .recovery_count(scenarios::DIAMOND_MERGE, RecoveryAlgorithm::Vector)
            .unwrap(),
        1
    );
    for device in [
        scenarios::DIAMOND_SPLIT,
        scenarios::DIAMOND_UPPER,
        scenarios::DIAMOND_LOWER,
        scenarios::DIAMOND_MERGE,
    ] {
        verifier.assert_recovery_unique(device).unwrap();
    }
    assert!(!tables.cb.contains(scenarios::DIAMOND_TALKER));
    assert!(!tables.cb.contains(scenarios::DIAMOND_LISTENER));

    let dmac = mac(scenarios::DIAMOND_MAC);
    verifier
        .assert_forward_ports(scenarios::DIAMOND_SPLIT, false, vlan(10), dmac, &[2, 3])
        .unwrap();
    verifier
        .assert_vlan_member(scenarios::DIAMOND_SPLIT, vlan(10), 3, false)
        .unwrap();
    verifier
        .assert_vlan_member(scenarios::DIAMOND_LOWER, vlan(20), 2, false)
        .unwrap();
}

/// Gate schedules on a Qbv bridge
///
/// Scenario:
/// 1. One port gets a computed two-slot schedule
/// 2. The bridge's other port gets disabled placeholder parameters
/// 3. End stations get no tables at all
#[test]
fn test_gcl_schedule_and_placeholders() {
    init_test_tracing();
    let snapshot = TopologyBuilder::new()
        .device(1, "talker", 1, capability_fixtures::end_station())
        .device(2, "bridge", 2, capability_fixtures::qbv_bridge(4))
        .connect(1, (1, 1), (2, 1))
        .gcl(2, 2, &[(0, 125_000, 0b1000), (125_000, 500_000, 0b0111)])
        .build();
    let tables = generate(&snapshot);
    let verifier = TableVerifier::new(&tables);

    verifier.assert_gcl_consistent(2, 2).unwrap();
    let gcl = tables.gcl.get(2).unwrap();
    assert_eq!(gcl.get(2).unwrap().admin_cycle_time.numerator, 500_000);
    let idle = gcl.get(1).unwrap();
    assert!(!idle.gate_enabled);
    assert_eq!(idle.admin_gate_states.bits(), 0b1111);

    for family in TableFamily::ALL {
        assert!(
            tables.device_count(family) <= 1,
            "{family} has a table for an end station"
        );
    }
    verifier.assert_device_count(TableFamily::Gcl, 1).unwrap();
    verifier.assert_device_count(TableFamily::Cb, 0).unwrap();
}

#[test]
fn test_gcl_mask_beyond_queues_fails() {
    init_test_tracing();
    let snapshot = TopologyBuilder::new()
        .device(2, "bridge", 1, capability_fixtures::qbv_bridge(2))
        .gcl(2, 1, &[(0, 100, 0b100)])
        .build();
    let mut deploy = DeployPathData::new(&snapshot, DeployConfig::default()).unwrap();
    let err = deploy.generate_data().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InternalError);
    assert!(deploy.tables().gcl.is_empty());
}

/// Per-stream classification with an L4 match
///
/// Scenario:
/// 1. Only a v2 bridge can classify UDP port matches
/// 2. A non-hybrid last bridge strips the tag through an untag entry
#[test]
fn test_stream_priority_with_transport_match() {
    init_test_tracing();
    let v1 = capability_fixtures::bridge().with(Capability::StreamPriorityV1);
    let v2 = capability_fixtures::bridge().with(Capability::StreamPriorityV2);
    let snapshot = TopologyBuilder::new()
        .device(1, "talker", 1, capability_fixtures::end_station())
        .device(2, "v1", 2, v1)
        .device(3, "v2", 2, v2)
        .device(4, "listener", 1, capability_fixtures::end_station())
        .connect(20, (1, 1), (2, 1))
        .connect(21, (2, 2), (3, 1))
        .connect(22, (3, 2), (4, 1))
        .stream(5, stream_setting("02:00:00:00:00:05", TagMode::UntaggedStreamPriority))
        .application(
            5,
            StreamMatch::Transport {
                protocol: TransportProtocol::Udp,
                port: 4789,
            },
        )
        .routing(
            RoutingResultBuilder::new(5, 300, 4)
                .path(&[1, 2, 3, 4], &[20, 21, 22], 300)
                .build(),
        )
        .build();
    let tables = generate(&snapshot);

    // The v1 bridge only gets a placeholder.
    assert!(tables.stad_port.get(2).unwrap().is_empty());
    let entries = tables.stad_port.get(3).unwrap().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].port, 1);
    assert_eq!(entries[0].vlan_id, vlan(300));
    assert!(tables.stad_config.get(3).unwrap().is_untagged(2, vlan(300)));
}

#[test]
fn test_conflicting_pvids_fail_after_vlan_tables() {
    init_test_tracing();
    let pvid_bridge = capability_fixtures::hybrid_bridge().with(Capability::DefaultPvid);
    let snapshot = TopologyBuilder::new()
        .device(1, "talker", 1, capability_fixtures::end_station())
        .device(2, "bridge", 2, pvid_bridge)
        .device(3, "listener", 1, capability_fixtures::end_station())
        .connect(1, (1, 1), (2, 1))
        .connect(2, (2, 2), (3, 1))
        .stream(1, stream_setting("02:00:00:00:00:01", TagMode::UntaggedPvid))
        .stream(2, stream_setting("02:00:00:00:00:02", TagMode::UntaggedPvid))
        .routing(RoutingResultBuilder::new(1, 5, 0).path(&[1, 2, 3], &[1, 2], 5).build())
        .routing(RoutingResultBuilder::new(2, 7, 0).path(&[1, 2, 3], &[1, 2], 7).build())
        .build();

    let mut deploy = DeployPathData::new(&snapshot, DeployConfig::default()).unwrap();
    let err = deploy.generate_data().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InternalError);

    let tables = deploy.tables();
    let verifier = TableVerifier::new(tables);
    verifier.assert_vlan_member(2, vlan(5), 1, false).unwrap();
    verifier.assert_vlan_member(2, vlan(7), 2, true).unwrap();
    assert!(tables.port_vlan.is_empty());
}

#[test]
fn test_routing_paths_share_the_frontier() {
    init_test_tracing();
    let mut snapshot = scenarios::line(TagMode::Tagged).build();
    snapshot.routing_results[0] = RoutingResultBuilder::new(scenarios::LINE_STREAM, 100, 3)
        .path(&[1, 2, 3, 4], &[10, 11, 12], 100)
        .next_routing_path()
        .path(&[1, 2, 3, 4], &[10, 11, 12], 200)
        .build();
    let tables = generate(&snapshot);

    // The repeated path only revisits configured segments.
    let bridge = tables.vlan_static.get(scenarios::LINE_B).unwrap();
    assert_eq!(bridge.len(), 1);
    assert!(bridge.entry(vlan(200)).is_none());
}

/// Snapshot loaded from JSON and tables written back out
#[test]
fn test_json_snapshot_to_json_tables() {
    init_test_tracing();
    let mut snapshot = scenarios::line(TagMode::UntaggedStreamPriority)
        .application(
            scenarios::LINE_STREAM,
            StreamMatch::Ethertype {
                ethertype: 0x88f7,
                subtype: None,
            },
        )
        .build();
    snapshot.devices[1].capabilities.stream_priority_v1 = true;

    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, "{}", serde_json::to_string(&snapshot).unwrap()).unwrap();
    let loaded = Snapshot::from_json_file(file.path()).unwrap();
    assert_eq!(loaded, snapshot);

    let tables = generate(&loaded);
    let json: serde_json::Value = serde_json::from_str(&tables.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["vlan_port_type"]["3"]["ports"]["2"], "Hybrid");
    assert_eq!(json["vlan_port_type"]["2"]["ports"]["1"], "Trunk");
    assert_eq!(json["stad_port"]["2"]["entries"][0]["vlan_id"], 100);
    assert_eq!(
        json["static_forward_unicast"]["2"][0]["destination_mac"],
        scenarios::LINE_MAC
    );
    assert_eq!(DeployTables::from_json_str(&json.to_string()).unwrap(), tables);
}
