//! Read-only network plan snapshot: devices, links, routed streams, gate
//! schedules and traffic design.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;
use tracing::info;
use tsn_types::{MacAddress, Pcp, VlanId};

use crate::error::{DeployError, DeployResult};

pub type DeviceId = u32;
pub type InterfaceId = u32;
pub type LinkId = u32;
pub type StreamId = u32;

/// Default number of traffic class queues per port.
pub const DEFAULT_QUEUE_COUNT: u8 = 8;

/// A configurable feature a device may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    VlanAccessTrunk,
    VlanHybrid,
    StreamPriorityV1,
    StreamPriorityV2,
    TeMstid,
    StaticForwardUnicast,
    StaticForwardMulticast,
    Qbv,
    Cb,
    DefaultPvid,
    DefaultPcp,
}

impl Capability {
    pub const ALL: [Capability; 11] = [
        Capability::VlanAccessTrunk,
        Capability::VlanHybrid,
        Capability::StreamPriorityV1,
        Capability::StreamPriorityV2,
        Capability::TeMstid,
        Capability::StaticForwardUnicast,
        Capability::StaticForwardMulticast,
        Capability::Qbv,
        Capability::Cb,
        Capability::DefaultPvid,
        Capability::DefaultPcp,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Capability::VlanAccessTrunk => "VlanAccessTrunk",
            Capability::VlanHybrid => "VlanHybrid",
            Capability::StreamPriorityV1 => "StreamPriorityV1",
            Capability::StreamPriorityV2 => "StreamPriorityV2",
            Capability::TeMstid => "TeMstid",
            Capability::StaticForwardUnicast => "StaticForwardUnicast",
            Capability::StaticForwardMulticast => "StaticForwardMulticast",
            Capability::Qbv => "Qbv",
            Capability::Cb => "Cb",
            Capability::DefaultPvid => "DefaultPvid",
            Capability::DefaultPcp => "DefaultPcp",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|cap| cap.as_str() == s)
            .ok_or_else(|| DeployError::parse("capability", format!("unknown capability '{s}'")))
    }
}

/// Capability matrix of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub vlan_access_trunk: bool,
    pub vlan_hybrid: bool,
    pub stream_priority_v1: bool,
    pub stream_priority_v2: bool,
    pub te_mstid: bool,
    pub static_forward_unicast: bool,
    pub static_forward_multicast: bool,
    pub qbv: bool,
    pub cb: bool,
    pub default_pvid: bool,
    pub default_pcp: bool,
    /// Traffic class queues per port, bounds the gate state mask.
    pub queue_count: u8,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            vlan_access_trunk: false,
            vlan_hybrid: false,
            stream_priority_v1: false,
            stream_priority_v2: false,
            te_mstid: false,
            static_forward_unicast: false,
            static_forward_multicast: false,
            qbv: false,
            cb: false,
            default_pvid: false,
            default_pcp: false,
            queue_count: DEFAULT_QUEUE_COUNT,
        }
    }
}

impl Capabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::VlanAccessTrunk => self.vlan_access_trunk,
            Capability::VlanHybrid => self.vlan_hybrid,
            Capability::StreamPriorityV1 => self.stream_priority_v1,
            Capability::StreamPriorityV2 => self.stream_priority_v2,
            Capability::TeMstid => self.te_mstid,
            Capability::StaticForwardUnicast => self.static_forward_unicast,
            Capability::StaticForwardMulticast => self.static_forward_multicast,
            Capability::Qbv => self.qbv,
            Capability::Cb => self.cb,
            Capability::DefaultPvid => self.default_pvid,
            Capability::DefaultPcp => self.default_pcp,
        }
    }

    /// Enables one capability.
    pub fn with(mut self, capability: Capability) -> Self {
        let flag = match capability {
            Capability::VlanAccessTrunk => &mut self.vlan_access_trunk,
            Capability::VlanHybrid => &mut self.vlan_hybrid,
            Capability::StreamPriorityV1 => &mut self.stream_priority_v1,
            Capability::StreamPriorityV2 => &mut self.stream_priority_v2,
            Capability::TeMstid => &mut self.te_mstid,
            Capability::StaticForwardUnicast => &mut self.static_forward_unicast,
            Capability::StaticForwardMulticast => &mut self.static_forward_multicast,
            Capability::Qbv => &mut self.qbv,
            Capability::Cb => &mut self.cb,
            Capability::DefaultPvid => &mut self.default_pvid,
            Capability::DefaultPcp => &mut self.default_pcp,
        };
        *flag = true;
        self
    }

    /// A device without any configurable feature is an end station.
    pub fn is_end_station(&self) -> bool {
        !Capability::ALL.iter().any(|cap| self.supports(*cap))
    }

    /// L2 (Ethertype) classification needs v1 or v2, L4 port matching
    /// needs v2.
    pub fn supports_stream_priority(&self, stream_match: &StreamMatch) -> bool {
        match stream_match {
            StreamMatch::Ethertype { .. } => self.stream_priority_v1 || self.stream_priority_v2,
            StreamMatch::Transport { .. } => self.stream_priority_v2,
        }
    }

    /// Hybrid VLAN untagging needs both the access/trunk and hybrid modes.
    pub fn supports_hybrid_untag(&self) -> bool {
        self.vlan_access_trunk && self.vlan_hybrid
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub id: InterfaceId,
    pub name: String,
}

/// A switch or end station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    #[serde(default)]
    pub capabilities: Capabilities,
}

impl Device {
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.supports(capability)
    }

    pub fn interface(&self, id: InterfaceId) -> Option<&Interface> {
        self.interfaces.iter().find(|intf| intf.id == id)
    }
}

/// A physical link. Orientation carries no meaning for path direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub source_device: DeviceId,
    pub source_interface: InterfaceId,
    pub destination_device: DeviceId,
    pub destination_interface: InterfaceId,
}

impl Link {
    /// Interface of this link on `device`, if the link touches it.
    pub fn interface_on(&self, device: DeviceId) -> Option<InterfaceId> {
        if self.source_device == device {
            Some(self.source_interface)
        } else if self.destination_device == device {
            Some(self.destination_interface)
        } else {
            None
        }
    }

    /// True if the link joins `a` and `b` in either orientation.
    pub fn connects(&self, a: DeviceId, b: DeviceId) -> bool {
        (self.source_device == a && self.destination_device == b)
            || (self.source_device == b && self.destination_device == a)
    }
}

/// One physical path of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedundantPath {
    pub device_ids: Vec<DeviceId>,
    pub link_ids: Vec<LinkId>,
    /// VLAN carried on this path.
    pub vlan_id: VlanId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingPath {
    pub redundant_paths: Vec<RedundantPath>,
}

/// Routing decision for one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingResult {
    pub stream_id: StreamId,
    /// Canonical VLAN of the stream.
    pub vlan_id: VlanId,
    pub pcp: Pcp,
    #[serde(default)]
    pub multicast: bool,
    /// Paths are disjoint FRER duplicates of one logical stream.
    #[serde(default)]
    pub cb: bool,
    pub paths: Vec<RoutingPath>,
}

impl RoutingResult {
    pub fn redundant_paths(&self) -> impl Iterator<Item = &RedundantPath> {
        self.paths.iter().flat_map(|path| path.redundant_paths.iter())
    }
}

/// One scheduled window of a port's gate control list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GclSlot {
    pub start_ns: u64,
    pub stop_ns: u64,
    pub gate_states: u8,
}

/// Scheduler output for one device interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GclResult {
    pub device_id: DeviceId,
    pub interface_id: InterfaceId,
    pub slots: Vec<GclSlot>,
}

/// How a stream's frames leave the talker and reach the listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagMode {
    /// End stations send and receive VLAN tagged frames.
    #[default]
    Tagged,
    /// Untagged; the entry port assigns the VLAN through its PVID.
    UntaggedPvid,
    /// Untagged; the entry port classifies per stream.
    UntaggedStreamPriority,
}

impl TagMode {
    pub const fn is_untagged(&self) -> bool {
        !matches!(self, TagMode::Tagged)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransportProtocol {
    Tcp,
    Udp,
}

/// Match criteria used to classify an application's frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StreamMatch {
    Ethertype {
        ethertype: u16,
        #[serde(default)]
        subtype: Option<u8>,
    },
    Transport {
        protocol: TransportProtocol,
        port: u16,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSetting {
    pub destination_mac: MacAddress,
    #[serde(default)]
    pub source_mac: Option<MacAddress>,
    #[serde(default)]
    pub tag_mode: TagMode,
    #[serde(default)]
    pub source_ip: Option<IpAddr>,
    #[serde(default)]
    pub destination_ip: Option<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSetting {
    pub stream_match: StreamMatch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficDesign {
    #[serde(default)]
    pub stream_settings: BTreeMap<StreamId, StreamSetting>,
    #[serde(default)]
    pub application_settings: BTreeMap<StreamId, ApplicationSetting>,
}

/// The complete input of one deployment cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub devices: Vec<Device>,
    pub links: Vec<Link>,
    #[serde(default)]
    pub routing_results: Vec<RoutingResult>,
    #[serde(default)]
    pub gcl_results: Vec<GclResult>,
    #[serde(default)]
    pub traffic_design: TrafficDesign,
}

impl Snapshot {
    pub fn from_json_str(text: &str) -> DeployResult<Self> {
        serde_json::from_str(text).map_err(|e| DeployError::parse("snapshot", e))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> DeployResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| DeployError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let snapshot: Snapshot = serde_json::from_str(&text)
            .map_err(|e| DeployError::parse(path.display().to_string(), e))?;

        info!(
            "Loaded snapshot from {}: {} devices, {} links, {} routing results",
            path.display(),
            snapshot.devices.len(),
            snapshot.links.len(),
            snapshot.routing_results.len()
        );
        Ok(snapshot)
    }
}

/// Id lookups over a [`Snapshot`].
#[derive(Debug)]
pub struct TopologyIndex<'a> {
    snapshot: &'a Snapshot,
    devices: HashMap<DeviceId, &'a Device>,
    links: HashMap<LinkId, &'a Link>,
}

impl<'a> TopologyIndex<'a> {
    /// Builds the index, rejecting duplicate device or link ids.
    pub fn new(snapshot: &'a Snapshot) -> DeployResult<Self> {
        let mut devices = HashMap::with_capacity(snapshot.devices.len());
        for device in &snapshot.devices {
            if devices.insert(device.id, device).is_some() {
                return Err(DeployError::internal(format!(
                    "duplicate device id {} in snapshot",
                    device.id
                )));
            }
        }

        let mut links = HashMap::with_capacity(snapshot.links.len());
        for link in &snapshot.links {
            if links.insert(link.id, link).is_some() {
                return Err(DeployError::internal(format!(
                    "duplicate link id {} in snapshot",
                    link.id
                )));
            }
        }

        Ok(Self {
            snapshot,
            devices,
            links,
        })
    }

    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    /// Devices in snapshot order.
    pub fn devices(&self) -> impl Iterator<Item = &'a Device> {
        self.snapshot.devices.iter()
    }

    pub fn device(&self, id: DeviceId) -> DeployResult<&'a Device> {
        self.devices
            .get(&id)
            .copied()
            .ok_or_else(|| DeployError::not_found("device", id))
    }

    pub fn link(&self, id: LinkId) -> DeployResult<&'a Link> {
        self.links
            .get(&id)
            .copied()
            .ok_or_else(|| DeployError::not_found("link", id))
    }

    pub fn stream_setting(&self, stream: StreamId) -> DeployResult<&'a StreamSetting> {
        self.snapshot
            .traffic_design
            .stream_settings
            .get(&stream)
            .ok_or_else(|| DeployError::not_found("stream setting", stream))
    }

    pub fn application_setting(&self, stream: StreamId) -> DeployResult<&'a ApplicationSetting> {
        self.snapshot
            .traffic_design
            .application_settings
            .get(&stream)
            .ok_or_else(|| DeployError::not_found("application setting", stream))
    }
}
