//! Bus endpoint addressing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A bus endpoint: `(subnet_id, device_id)`.
///
/// Addresses are plain values; two addresses are equal when both ids match.
/// In configuration files they are written as a two-element array, e.g.
/// `source_address = [254, 253]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(u8, u8)", into = "(u8, u8)")]
pub struct Address {
    pub subnet_id: u8,
    pub device_id: u8,
}

impl Address {
    /// Default address used by this controller when sending.
    pub const CONTROLLER: Address = Address::new(254, 253);

    /// Bus-wide broadcast address.
    pub const BROADCAST: Address = Address::new(255, 255);

    pub const fn new(subnet_id: u8, device_id: u8) -> Self {
        Self {
            subnet_id,
            device_id,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl From<(u8, u8)> for Address {
    fn from((subnet_id, device_id): (u8, u8)) -> Self {
        Self::new(subnet_id, device_id)
    }
}

impl From<Address> for (u8, u8) {
    fn from(address: Address) -> Self {
        (address.subnet_id, address.device_id)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.subnet_id, self.device_id)
    }
}
