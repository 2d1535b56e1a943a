//! Hop classification over the redundant paths of a routing result.
//!
//! Every generator walks paths through [`walk_routing_result`], so a
//! physical segment shared by several redundant paths is configured by the
//! first path that reaches it and skipped (as [`HopKind::Duplicate`]) by
//! the others.

use std::collections::HashSet;
use tracing::debug;

use crate::error::{DeployError, DeployResult};
use crate::topology::{Device, InterfaceId, LinkId, RedundantPath, RoutingResult, TopologyIndex};

/// Position of a hop relative to segments configured by earlier paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HopKind {
    /// Neither adjacent link seen before.
    Forward,
    /// Arrives over a shared segment, leaves over a new one.
    Split,
    /// Arrives over a new segment, leaves over a shared one.
    Merge,
    /// Both links already configured.
    Duplicate,
}

impl HopKind {
    pub const fn classify(ingress_seen: bool, egress_seen: bool) -> Self {
        match (ingress_seen, egress_seen) {
            (false, false) => HopKind::Forward,
            (true, false) => HopKind::Split,
            (false, true) => HopKind::Merge,
            (true, true) => HopKind::Duplicate,
        }
    }

    pub const fn is_duplicate(&self) -> bool {
        matches!(self, HopKind::Duplicate)
    }
}

/// A device port reached over a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub link_id: LinkId,
    pub interface_id: InterfaceId,
}

/// One device visit on a redundant path.
#[derive(Debug, Clone)]
pub struct Hop<'a> {
    pub index: usize,
    pub device: &'a Device,
    pub ingress: Option<PortRef>,
    pub egress: Option<PortRef>,
    pub previous: Option<&'a Device>,
    pub next: Option<&'a Device>,
    pub kind: HopKind,
}

impl Hop<'_> {
    pub fn ingress_interface(&self) -> Option<InterfaceId> {
        self.ingress.map(|port| port.interface_id)
    }

    pub fn egress_interface(&self) -> Option<InterfaceId> {
        self.egress.map(|port| port.interface_id)
    }

    /// The next device does not relay VLAN tagged frames (an end station
    /// or a bridge without access/trunk support).
    pub fn next_is_untagged_edge(&self) -> bool {
        self.next
            .is_some_and(|next| !next.capabilities.vlan_access_trunk)
    }
}

/// Ingress links already processed by earlier redundant paths of the same
/// routing result.
#[derive(Debug, Clone, Default)]
pub struct LinkFrontier {
    used_link_ids: HashSet<LinkId>,
}

impl LinkFrontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, link: LinkId) -> bool {
        self.used_link_ids.contains(&link)
    }

    pub fn insert(&mut self, link: LinkId) {
        self.used_link_ids.insert(link);
    }

    pub fn len(&self) -> usize {
        self.used_link_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used_link_ids.is_empty()
    }
}

/// A redundant path together with its classified hops.
#[derive(Debug, Clone)]
pub struct WalkedPath<'a> {
    pub path: &'a RedundantPath,
    pub hops: Vec<Hop<'a>>,
}

/// Walks one redundant path, classifying each hop against `frontier` and
/// adding each hop's ingress link to it.
///
/// A missing link (talker ingress, listener egress) takes the state of the
/// hop's other link, so revisiting a talker or listener yields a duplicate
/// rather than a split or merge.
pub fn walk_path<'a>(
    index: &TopologyIndex<'a>,
    path: &'a RedundantPath,
    frontier: &mut LinkFrontier,
) -> DeployResult<Vec<Hop<'a>>> {
    let device_ids = &path.device_ids;
    let link_ids = &path.link_ids;

    if device_ids.is_empty() {
        return Err(DeployError::internal("redundant path has no devices"));
    }
    if device_ids.len() != link_ids.len() + 1 {
        return Err(DeployError::internal(format!(
            "malformed redundant path: {} devices but {} links",
            device_ids.len(),
            link_ids.len()
        )));
    }

    let devices = device_ids
        .iter()
        .map(|id| index.device(*id))
        .collect::<DeployResult<Vec<_>>>()?;

    // Port of each link on both of its path neighbours.
    let mut segments = Vec::with_capacity(link_ids.len());
    for (i, link_id) in link_ids.iter().enumerate() {
        let link = index.link(*link_id)?;
        let (upstream, downstream) = (device_ids[i], device_ids[i + 1]);
        if !link.connects(upstream, downstream) {
            return Err(DeployError::internal(format!(
                "link {} does not connect devices {} and {}",
                link_id, upstream, downstream
            )));
        }
        let port_on = |device| {
            link.interface_on(device).map(|interface_id| PortRef {
                link_id: *link_id,
                interface_id,
            })
        };
        match (port_on(upstream), port_on(downstream)) {
            (Some(egress), Some(ingress)) => {
                ensure_interface(devices[i], egress.interface_id)?;
                ensure_interface(devices[i + 1], ingress.interface_id)?;
                segments.push((egress, ingress));
            }
            _ => {
                return Err(DeployError::internal(format!(
                    "link {} has no endpoint on the path",
                    link_id
                )))
            }
        }
    }

    let last = devices.len() - 1;
    let mut hops = Vec::with_capacity(devices.len());
    for (i, device) in devices.iter().enumerate() {
        let ingress = i.checked_sub(1).map(|prev| segments[prev].1);
        let egress = (i < last).then(|| segments[i].0);

        let ingress_seen = ingress.map(|port| frontier.contains(port.link_id));
        let egress_seen = egress.map(|port| frontier.contains(port.link_id));
        let kind = match (ingress_seen, egress_seen) {
            (Some(ingress), Some(egress)) => HopKind::classify(ingress, egress),
            (None, Some(seen)) | (Some(seen), None) => HopKind::classify(seen, seen),
            (None, None) => HopKind::Forward,
        };

        debug!(
            device = device.id,
            hop = i,
            ?kind,
            ingress = ?ingress.map(|p| p.interface_id),
            egress = ?egress.map(|p| p.interface_id),
            "classified hop"
        );

        hops.push(Hop {
            index: i,
            device,
            ingress,
            egress,
            previous: i.checked_sub(1).map(|prev| devices[prev]),
            next: (i < last).then(|| devices[i + 1]),
            kind,
        });

        if let Some(port) = ingress {
            frontier.insert(port.link_id);
        }
    }

    Ok(hops)
}

fn ensure_interface(device: &Device, interface: InterfaceId) -> DeployResult<()> {
    match device.interface(interface) {
        Some(_) => Ok(()),
        None => Err(DeployError::not_found(
            "interface",
            format!("{}/{}", device.id, interface),
        )),
    }
}

/// Walks every redundant path of `result` in order with a frontier shared
/// across all of its routing paths.
pub fn walk_routing_result<'a>(
    index: &TopologyIndex<'a>,
    result: &'a RoutingResult,
) -> DeployResult<Vec<WalkedPath<'a>>> {
    let mut frontier = LinkFrontier::new();
    result
        .redundant_paths()
        .map(|path| {
            walk_path(index, path, &mut frontier).map(|hops| WalkedPath { path, hops })
        })
        .collect()
}
