//! Bus error types.

use std::net::SocketAddr;

use buspro_core::EncodeError;

/// UDP transport failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The receive socket could not be created or bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A configured host did not resolve.
    #[error("Cannot resolve address: {0}")]
    Resolve(String),

    /// Any other socket-level failure.
    #[error("Socket error: {0}")]
    Socket(#[from] std::io::Error),
}

/// A telegram handler failed to process a telegram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),

    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        HandlerError::Failed(msg.into())
    }
}

/// Errors surfaced by the [`Bus`](crate::Bus) façade.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] buspro_core::Error),

    #[error("Bus is already running")]
    AlreadyRunning,
}

pub type BusResult<T> = std::result::Result<T, BusError>;
