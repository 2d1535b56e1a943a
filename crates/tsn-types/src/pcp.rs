//! 802.1Q priority code point.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 3-bit priority code point (0-7).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Pcp(u8);

impl Pcp {
    pub const MAX: u8 = 7;

    /// Creates a PCP.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not fit in 3 bits.
    pub const fn new(value: u8) -> Result<Self, ParseError> {
        if value <= Self::MAX {
            Ok(Pcp(value))
        } else {
            Err(ParseError::InvalidPcp(value))
        }
    }

    pub const fn as_u8(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Pcp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Pcp {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Pcp::new(value)
    }
}

impl From<Pcp> for u8 {
    fn from(pcp: Pcp) -> u8 {
        pcp.0
    }
}
