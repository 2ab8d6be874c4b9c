//! Wire codec for telegrams.
//!
//! Frame layout (multi-byte fields big-endian):
//!
//! | Offset  | Field                          | Size |
//! |---------|--------------------------------|------|
//! | 0       | origin IPv4                    | 4    |
//! | 4       | signature `HDLMIRACLE` `AA AA` | 12   |
//! | 16      | length (11 + payload length)   | 1    |
//! | 17      | source subnet                  | 1    |
//! | 18      | source device                  | 1    |
//! | 19      | source device type             | 2    |
//! | 21      | operate code                   | 2    |
//! | 23      | target subnet                  | 1    |
//! | 24      | target device                  | 1    |
//! | 25      | payload                        | n    |
//! | 25 + n  | CRC16-CCITT                    | 2    |
//!
//! The CRC covers the length byte through the last payload byte.

use std::net::{Ipv4Addr, SocketAddr};

use crate::address::Address;
use crate::error::{DecodeError, EncodeError};
use crate::operate_code::{DeviceType, OperateCode};
use crate::telegram::Telegram;

pub const PREAMBLE_LEN: usize = 16;
pub const SIGNATURE: [u8; 12] = *b"HDLMIRACLE\xAA\xAA";
/// Bytes counted by the length field besides the payload.
pub const FIXED_FIELDS_LEN: usize = 11;
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize - FIXED_FIELDS_LEN;
pub const MIN_FRAME_LEN: usize = PREAMBLE_LEN + FIXED_FIELDS_LEN;
/// Origin written by default when encoding.
pub const DEFAULT_ORIGIN: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 15);

const IDX_LENGTH: usize = 16;
const IDX_SRC_SUBNET: usize = 17;
const IDX_SRC_DEVICE: usize = 18;
const IDX_DEVICE_TYPE: usize = 19;
const IDX_OPERATE_CODE: usize = 21;
const IDX_TGT_SUBNET: usize = 23;
const IDX_TGT_DEVICE: usize = 24;
const IDX_PAYLOAD: usize = 25;

const CRC_POLY: u16 = 0x1021;
const CRC_TABLE: [u16; 256] = crc_table();

const fn crc_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// CRC16-CCITT: poly 0x1021, init 0x0000, no reflection, no final XOR.
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |crc, &b| {
        (crc << 8) ^ CRC_TABLE[usize::from((crc >> 8) as u8 ^ b)]
    })
}

/// Encoder for outgoing telegrams.
///
/// The only per-instance state is the origin address written into the
/// preamble; decoding is stateless and lives in [`decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelegramCodec {
    origin: Ipv4Addr,
}

impl Default for TelegramCodec {
    fn default() -> Self {
        Self::new(DEFAULT_ORIGIN)
    }
}

impl TelegramCodec {
    pub fn new(origin: Ipv4Addr) -> Self {
        Self { origin }
    }

    pub fn origin(&self) -> Ipv4Addr {
        self.origin
    }

    /// Serialise a telegram into a datagram.
    ///
    /// The device-type field is always the controller marker, regardless of
    /// `telegram.source_device_type`.
    pub fn encode(&self, telegram: &Telegram) -> Result<Vec<u8>, EncodeError> {
        let payload = &telegram.payload;
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(EncodeError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }

        let length = FIXED_FIELDS_LEN + payload.len();
        let mut buf = Vec::with_capacity(PREAMBLE_LEN + length);

        buf.extend_from_slice(&self.origin.octets());
        buf.extend_from_slice(&SIGNATURE);
        buf.push(length as u8);
        buf.push(telegram.source_address.subnet_id);
        buf.push(telegram.source_address.device_id);
        buf.extend_from_slice(&DeviceType::CONTROLLER.to_be_bytes());
        buf.extend_from_slice(&telegram.operate_code.to_be_bytes());
        buf.push(telegram.target_address.subnet_id);
        buf.push(telegram.target_address.device_id);
        buf.extend_from_slice(payload);

        let crc = crc16(&buf[IDX_LENGTH..]);
        buf.extend_from_slice(&crc.to_be_bytes());

        debug_assert_eq!(buf.len(), PREAMBLE_LEN + length);
        Ok(buf)
    }

    pub fn decode(&self, raw: &[u8], sender: Option<SocketAddr>) -> Result<Telegram, DecodeError> {
        decode(raw, sender)
    }
}

/// Encode with the default origin.
pub fn encode(telegram: &Telegram) -> Result<Vec<u8>, EncodeError> {
    TelegramCodec::default().encode(telegram)
}

/// Parse and verify one datagram.
///
/// Fails without producing a telegram when the datagram is too short, the
/// signature is damaged, the length byte disagrees with the datagram size, or
/// the checksum does not match.
///
/// The origin IPv4 in bytes 0..4 is neither checksummed nor validated, so a
/// corrupted origin still decodes and shows up in [`Telegram::origin`]. Every
/// other byte is covered by the signature, length or CRC check.
pub fn decode(raw: &[u8], sender: Option<SocketAddr>) -> Result<Telegram, DecodeError> {
    if raw.len() < MIN_FRAME_LEN {
        return Err(DecodeError::TooShort {
            len: raw.len(),
            min: MIN_FRAME_LEN,
        });
    }

    if raw[4..PREAMBLE_LEN] != SIGNATURE {
        return Err(DecodeError::BadSignature);
    }

    let declared = raw[IDX_LENGTH];
    if usize::from(declared) < FIXED_FIELDS_LEN {
        return Err(DecodeError::InvalidLength(declared));
    }

    let expected = PREAMBLE_LEN + usize::from(declared);
    if raw.len() != expected {
        return Err(DecodeError::LengthMismatch {
            declared,
            expected,
            actual: raw.len(),
        });
    }

    let crc_at = expected - 2;
    let received = u16::from_be_bytes([raw[crc_at], raw[crc_at + 1]]);
    let computed = crc16(&raw[IDX_LENGTH..crc_at]);
    if computed != received {
        return Err(DecodeError::Checksum { computed, received });
    }

    Ok(Telegram {
        source_address: Address::new(raw[IDX_SRC_SUBNET], raw[IDX_SRC_DEVICE]),
        source_device_type: DeviceType::from_be_bytes([
            raw[IDX_DEVICE_TYPE],
            raw[IDX_DEVICE_TYPE + 1],
        ]),
        operate_code: OperateCode::from_be_bytes([
            raw[IDX_OPERATE_CODE],
            raw[IDX_OPERATE_CODE + 1],
        ]),
        target_address: Address::new(raw[IDX_TGT_SUBNET], raw[IDX_TGT_DEVICE]),
        payload: raw[IDX_PAYLOAD..crc_at].to_vec(),
        origin: Some(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3])),
        checksum: Some(received),
        raw: raw.to_vec(),
        sender,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crc16_bitwise(data: &[u8]) -> u16 {
        let mut crc: u16 = 0;
        for &b in data {
            crc ^= u16::from(b) << 8;
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ CRC_POLY
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    #[test]
    fn test_crc_check_value() {
        // CRC-16/XMODEM check value
        assert_eq!(crc16(b"123456789"), 0x31C3);
        assert_eq!(crc16(&[]), 0x0000);
    }

    #[test]
    fn test_crc_table_matches_known_entries() {
        assert_eq!(CRC_TABLE[0x00], 0x0000);
        assert_eq!(CRC_TABLE[0x01], 0x1021);
        assert_eq!(CRC_TABLE[0x10], 0x1231);
        assert_eq!(CRC_TABLE[0x80], 0x9188);
        assert_eq!(CRC_TABLE[0xFF], 0x1EF0);
    }

    #[test]
    fn test_table_and_bitwise_agree() {
        let data: Vec<u8> = (0..=255u8).collect();
        for window in data.windows(13) {
            assert_eq!(crc16(window), crc16_bitwise(window));
        }
    }

    #[test]
    fn test_encode_layout() {
        let telegram = Telegram::new(
            Address::new(1, 10),
            OperateCode::SINGLE_CHANNEL_CONTROL,
            vec![1, 100, 0, 0],
        );
        let buf = encode(&telegram).unwrap();

        assert_eq!(buf.len(), 31);
        assert_eq!(&buf[..4], &[192, 168, 1, 15]);
        assert_eq!(&buf[4..16], b"HDLMIRACLE\xAA\xAA");
        assert_eq!(buf[16], 15);
        assert_eq!(&buf[17..19], &[254, 253]);
        assert_eq!(&buf[19..21], &[0xFF, 0xFC]);
        assert_eq!(&buf[21..23], &[0x00, 0x31]);
        assert_eq!(&buf[23..25], &[1, 10]);
        assert_eq!(&buf[25..29], &[1, 100, 0, 0]);

        let crc = crc16_bitwise(&buf[16..29]);
        assert_eq!(&buf[29..], &crc.to_be_bytes());
    }

    #[test]
    fn test_payload_limit() {
        let telegram = Telegram::new(
            Address::new(1, 1),
            OperateCode::new(0x0001),
            vec![0; MAX_PAYLOAD_LEN],
        );
        assert_eq!(encode(&telegram).unwrap()[16], 255);

        let too_big = Telegram::new(
            Address::new(1, 1),
            OperateCode::new(0x0001),
            vec![0; MAX_PAYLOAD_LEN + 1],
        );
        assert_eq!(
            encode(&too_big),
            Err(EncodeError::PayloadTooLarge {
                len: MAX_PAYLOAD_LEN + 1,
                max: MAX_PAYLOAD_LEN
            })
        );
    }

    #[test]
    fn test_custom_origin() {
        let codec = TelegramCodec::new(Ipv4Addr::new(10, 1, 2, 3));
        let telegram = Telegram::new(Address::new(2, 3), OperateCode::new(0x0033), vec![]);
        let buf = codec.encode(&telegram).unwrap();
        let decoded = codec.decode(&buf, None).unwrap();
        assert_eq!(decoded.origin, Some(Ipv4Addr::new(10, 1, 2, 3)));
    }
}
