//! Common types for TSN switch deployment.
//!
//! This crate provides validated representations of the network primitives
//! that appear in per-device TSN configuration tables:
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses
//! - [`VlanId`]: IEEE 802.1Q VLAN identifiers
//! - [`Pcp`]: 3-bit 802.1Q priority code points
//! - [`GateStateMask`]: 802.1Qbv per-queue gate states
//! - [`VlanPortType`]: Access/Trunk/Hybrid VLAN port modes

mod gate;
mod mac;
mod pcp;
mod port;
mod vlan;

pub use gate::GateStateMask;
pub use mac::MacAddress;
pub use pcp::Pcp;
pub use port::VlanPortType;
pub use vlan::VlanId;

/// Common error type for parsing and range-check failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u16),

    #[error("invalid PCP: {0} (must be 0-7)")]
    InvalidPcp(u8),

    #[error("invalid queue count: {0} (must be 1-8)")]
    InvalidQueueCount(u8),

    #[error("gate state mask {mask:#04x} uses queues beyond queue count {queue_count}")]
    GateStateOutOfRange { mask: u8, queue_count: u8 },

    #[error("invalid VLAN port type: {0}")]
    InvalidVlanPortType(String),
}
