//! Error types shared by the Buspro crates.
//!
//! `DecodeError` and `EncodeError` describe wire-level failures produced by the
//! codec. `Error` is the unified error used by configuration loading and by
//! callers that want a single error type across the workspace.

/// Reasons an inbound datagram could not be turned into a telegram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Datagram is smaller than the smallest possible frame.
    #[error("Datagram too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    /// The fixed protocol signature in the preamble is missing or damaged.
    #[error("Missing protocol signature in preamble")]
    BadSignature,

    /// The length byte is smaller than the fixed field budget.
    #[error("Declared length {0} is below the fixed field size")]
    InvalidLength(u8),

    /// The length byte disagrees with the datagram size.
    #[error("Declared length {declared} implies {expected} bytes, datagram has {actual}")]
    LengthMismatch {
        declared: u8,
        expected: usize,
        actual: usize,
    },

    /// Recomputed CRC differs from the transmitted one.
    #[error("Checksum mismatch: computed {computed:#06x}, received {received:#06x}")]
    Checksum { computed: u16, received: u16 },
}

impl DecodeError {
    /// Framing errors are size/structure problems; everything else is
    /// content corruption.
    pub fn is_framing(&self) -> bool {
        !matches!(self, DecodeError::Checksum { .. })
    }
}

/// Reasons a telegram could not be serialised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Payload does not fit the one-byte length field.
    #[error("Payload of {len} bytes exceeds the maximum of {max}")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Unified error type for Buspro.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Wire decode errors.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Wire encode errors.
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse errors.
    #[error("Parse error in {location}: {message}")]
    Parse { location: String, message: String },

    /// Other errors.
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, Error>;

/// Build an [`Error::Config`] from a message or format string.
#[macro_export]
macro_rules! config_err {
    ($msg:expr) => {
        $crate::error::Error::Config($msg.into())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::Config(format!($fmt, $($arg)*))
    };
}

/// Build an [`Error::Validation`] from a message or format string.
#[macro_export]
macro_rules! validation_err {
    ($msg:expr) => {
        $crate::error::Error::Validation($msg.into())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::Validation(format!($fmt, $($arg)*))
    };
}
