//! Core types for the Buspro field bus.
//!
//! This crate holds everything that does not touch a socket: addressing,
//! the telegram model, the wire codec and the configuration model.

pub mod address;
pub mod codec;
pub mod config;
pub mod error;
pub mod operate_code;
pub mod telegram;

pub use address::Address;
pub use codec::{decode, encode, TelegramCodec};
pub use config::{BusConfig, BusproConfig, SchedulerConfig};
pub use error::{DecodeError, EncodeError, Error, Result};
pub use operate_code::{DeviceType, OperateCode};
pub use telegram::Telegram;

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::address::Address;
    pub use crate::codec::{crc16, decode, encode, TelegramCodec};
    pub use crate::config::{defaults, env_vars, BusConfig, BusproConfig, SchedulerConfig};
    pub use crate::error::{DecodeError, EncodeError, Error, Result};
    pub use crate::operate_code::{DeviceType, OperateCode};
    pub use crate::telegram::Telegram;
}
