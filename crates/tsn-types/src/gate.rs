//! 802.1Qbv gate state bitmask.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-queue gate states of one gate control list entry.
///
/// Bit `n` set means the transmission gate of traffic class queue `n` is
/// open. The table format carries one octet, so at most
/// [`GateStateMask::MAX_QUEUES`] queues (bits 0..=7) can be described.
///
/// # Examples
///
/// ```
/// use tsn_types::GateStateMask;
///
/// let idle = GateStateMask::all_open(8).unwrap();
/// assert_eq!(idle.bits(), 0xff);
///
/// let mask = GateStateMask::checked(0b0000_0101, 3).unwrap();
/// assert!(mask.is_open(2));
/// assert!(GateStateMask::checked(0b0000_1000, 3).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateStateMask(u8);

impl GateStateMask {
    pub const MAX_QUEUES: u8 = 8;

    /// All gates closed.
    pub const CLOSED: GateStateMask = GateStateMask(0);

    /// Idle gate state: every queue of a port with `queue_count` queues open,
    /// i.e. `2^queue_count - 1`.
    pub fn all_open(queue_count: u8) -> Result<Self, ParseError> {
        Self::validate_queue_count(queue_count)?;
        Ok(GateStateMask(u8::MAX >> (Self::MAX_QUEUES - queue_count)))
    }

    /// Wraps `mask` after checking it only uses bits `0..queue_count`.
    pub fn checked(mask: u8, queue_count: u8) -> Result<Self, ParseError> {
        let limit = Self::all_open(queue_count)?;
        if mask & !limit.0 != 0 {
            return Err(ParseError::GateStateOutOfRange { mask, queue_count });
        }
        Ok(GateStateMask(mask))
    }

    /// Fails for queue counts outside `1..=8`.
    pub fn validate_queue_count(queue_count: u8) -> Result<(), ParseError> {
        if queue_count == 0 || queue_count > Self::MAX_QUEUES {
            return Err(ParseError::InvalidQueueCount(queue_count));
        }
        Ok(())
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Returns true if the gate of `queue` is open. Queues past bit 7 are
    /// always reported closed.
    pub const fn is_open(&self, queue: u8) -> bool {
        queue < Self::MAX_QUEUES && self.0 & (1 << queue) != 0
    }
}

impl fmt::Display for GateStateMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.0)
    }
}

impl From<GateStateMask> for u8 {
    fn from(mask: GateStateMask) -> u8 {
        mask.0
    }
}
