//! Error types for kvbridge.

use crate::result_code::ResultCode;
use std::os::raw::c_int;
use thiserror::Error;

/// Result type for kvbridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a connection.
///
/// [`Error::Engine`] carries a failure reported by the engine. Every other
/// variant is a local precondition violation, raised before any native call.
#[derive(Debug, Error)]
pub enum Error {
    /// The engine reported a failure.
    #[error("{code}: {message}")]
    Engine {
        /// Mapped result code.
        code: ResultCode,
        /// Native value as returned by the engine.
        raw: c_int,
        /// Engine error log, or the symbolic code name when the log is empty.
        message: String,
    },

    /// Text input could not be encoded as UTF-8.
    #[error("malformed text: unpaired surrogate at code unit {position}")]
    Encoding {
        /// Index of the offending UTF-16 code unit.
        position: usize,
    },

    /// Keys must contain at least one byte.
    #[error("key must not be empty")]
    EmptyKey,

    /// Key length does not fit the engine's `int` length parameter.
    #[error("key of {len} bytes exceeds the engine limit of {max} bytes")]
    KeyTooLarge {
        /// Encoded key length.
        len: usize,
        /// Largest accepted key length.
        max: usize,
    },

    /// Value length does not fit the engine's 64-bit length parameter.
    #[error("value of {len} bytes exceeds the engine limit")]
    ValueTooLarge {
        /// Encoded value length.
        len: usize,
    },

    /// A byte window reaches past the end of its backing slice.
    #[error("window at offset {offset} with length {len} exceeds buffer of {available} bytes")]
    OutOfBounds {
        /// Window start.
        offset: usize,
        /// Window length.
        len: usize,
        /// Backing slice length.
        available: usize,
    },

    /// A numeric setting does not fit the engine's `int` parameter.
    #[error("{setting} of {value} exceeds the engine limit of {max}")]
    OutOfRange {
        /// Name of the setting.
        setting: &'static str,
        /// Requested value.
        value: u64,
        /// Largest accepted value.
        max: u64,
    },

    /// The database path cannot be passed to the engine.
    #[error("invalid database path: {reason}")]
    InvalidPath {
        /// Why the path was rejected.
        reason: String,
    },

    /// The connection was closed; its handle is gone.
    #[error("connection is closed")]
    Closed,

    /// A stored value requested as text is not valid UTF-8.
    #[error("stored value is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Creates an engine error.
    pub fn engine(code: ResultCode, raw: c_int, message: impl Into<String>) -> Self {
        Self::Engine {
            code,
            raw,
            message: message.into(),
        }
    }

    /// Creates an invalid path error.
    pub fn invalid_path(reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            reason: reason.into(),
        }
    }

    /// Converts a setting to the engine's `int`, rejecting values it cannot hold.
    pub(crate) fn int_setting(setting: &'static str, value: u32) -> Result<c_int> {
        c_int::try_from(value).map_err(|_| Self::OutOfRange {
            setting,
            value: u64::from(value),
            max: u64::from(c_int::MAX.unsigned_abs()),
        })
    }

    /// Returns the engine result code, if the engine reported this error.
    #[must_use]
    pub fn code(&self) -> Option<ResultCode> {
        match self {
            Self::Engine { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true for precondition violations detected before any native call.
    #[must_use]
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::Engine { .. })
    }
}
