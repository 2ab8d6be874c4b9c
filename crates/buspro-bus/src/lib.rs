//! UDP transport, dispatch and the bus façade.
//!
//! ```no_run
//! use std::sync::Arc;
//! use buspro_bus::{handler_fn, Bus};
//! use buspro_core::{Address, BusConfig, OperateCode, Telegram};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = Arc::new(Bus::new(BusConfig::default())?);
//! bus.register(
//!     Address::new(1, 10),
//!     handler_fn(|t| {
//!         println!("{}", t);
//!         Ok(())
//!     }),
//! );
//! bus.start().await?;
//! bus.send(&Telegram::new(
//!     Address::new(1, 10),
//!     OperateCode::SINGLE_CHANNEL_CONTROL,
//!     vec![1, 100, 0, 0],
//! ))
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod dispatcher;
pub mod error;
pub mod stats;
pub mod transport;

pub use bus::Bus;
pub use dispatcher::{handler_fn, DispatchReport, Dispatcher, SharedHandler, TelegramHandler};
pub use error::{BusError, BusResult, HandlerError, TransportError};
pub use stats::{BusStats, BusStatsSnapshot};
pub use transport::{ReceiveCallback, UdpTransport};
