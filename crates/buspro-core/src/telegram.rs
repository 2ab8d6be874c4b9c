//! The telegram: one protocol message.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};

use crate::address::Address;
use crate::operate_code::{DeviceType, OperateCode};

/// One decoded or to-be-encoded protocol message.
///
/// Frame content is `source_address`, `operate_code`, `target_address` and
/// `payload`; two telegrams compare equal when their frame content matches.
/// The remaining fields describe where a decoded telegram came from and are
/// ignored by equality.
#[derive(Debug, Clone)]
pub struct Telegram {
    pub source_address: Address,
    pub source_device_type: DeviceType,
    pub operate_code: OperateCode,
    pub target_address: Address,
    pub payload: Vec<u8>,
    /// Originator IPv4 from the preamble (decoded telegrams only).
    pub origin: Option<Ipv4Addr>,
    /// Transmitted CRC (decoded telegrams only).
    pub checksum: Option<u16>,
    /// Wire bytes as received (decoded telegrams only).
    pub raw: Vec<u8>,
    /// UDP peer the datagram arrived from.
    pub sender: Option<SocketAddr>,
}

impl Telegram {
    /// Build an outgoing telegram from this controller to `target_address`.
    pub fn new(target_address: Address, operate_code: OperateCode, payload: Vec<u8>) -> Self {
        Self {
            source_address: Address::CONTROLLER,
            source_device_type: DeviceType::CONTROLLER,
            operate_code,
            target_address,
            payload,
            origin: None,
            checksum: None,
            raw: Vec::new(),
            sender: None,
        }
    }

    /// Override the source address.
    pub fn with_source(mut self, source_address: Address) -> Self {
        self.source_address = source_address;
        self
    }

    /// True when this telegram came off the wire.
    pub fn is_decoded(&self) -> bool {
        self.checksum.is_some()
    }

    /// Payload rendered as space-separated hex, for logs.
    pub fn payload_hex(&self) -> String {
        self.payload
            .iter()
            .map(|b| hex::encode([*b]))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl PartialEq for Telegram {
    fn eq(&self, other: &Self) -> bool {
        self.source_address == other.source_address
            && self.operate_code == other.operate_code
            && self.target_address == other.target_address
            && self.payload == other.payload
    }
}

impl Eq for Telegram {}

impl fmt::Display for Telegram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} op={:?} payload=[{}]",
            self.source_address,
            self.target_address,
            self.operate_code,
            self.payload_hex()
        )
    }
}
