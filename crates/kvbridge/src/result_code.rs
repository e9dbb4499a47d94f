//! Engine result codes.

use kvbridge_sys::constants as sys;
use std::fmt;
use std::os::raw::c_int;

/// Status reported by the engine for a single call.
///
/// The discriminants are the engine's native values. [`ResultCode::Unknown`]
/// is the catch-all for values this crate does not recognize and has no
/// native value of its own.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// Operation succeeded.
    Ok = sys::OK,
    /// Out of memory.
    OutOfMemory = sys::NOMEM,
    /// I/O error.
    IoError = sys::IOERR,
    /// Empty record or key.
    Empty = sys::EMPTY,
    /// Locked operation.
    Locked = sys::LOCKED,
    /// Record not found.
    NotFound = sys::NOTFOUND,
    /// Database limit reached.
    LimitReached = sys::LIMIT,
    /// Invalid parameter.
    InvalidArgument = sys::INVALID,
    /// Another thread released this instance.
    Abort = sys::ABORT,
    /// Record already exists.
    AlreadyExists = sys::EXISTS,
    /// Unknown configuration option.
    UnknownConfigOption = sys::UNKNOWN,
    /// Database file locked by another process.
    Busy = sys::BUSY,
    /// Not implemented by the underlying storage engine.
    NotImplemented = sys::NOTIMPLEMENTED,
    /// End of input.
    EndOfInput = sys::EOF,
    /// Permission denied.
    PermissionDenied = sys::PERM,
    /// No such method.
    NoSuchMethod = sys::NOOP,
    /// Corrupt database image.
    Corrupt = sys::CORRUPT,
    /// Operation done.
    Done = sys::DONE,
    /// Script compile error.
    CompileError = sys::COMPILE_ERR,
    /// Virtual machine error.
    VmError = sys::VM_ERR,
    /// Database full.
    Full = sys::FULL,
    /// Unable to open the database.
    CantOpen = sys::CANTOPEN,
    /// Read-only storage engine or connection.
    ReadOnly = sys::READ_ONLY,
    /// Locking protocol error.
    LockProtocolError = sys::LOCKERR,
    /// Unrecognized native value.
    Unknown = i32::MIN,
}

impl ResultCode {
    /// Every code with a native value, in declaration order.
    pub const KNOWN: [ResultCode; 24] = [
        ResultCode::Ok,
        ResultCode::OutOfMemory,
        ResultCode::IoError,
        ResultCode::Empty,
        ResultCode::Locked,
        ResultCode::NotFound,
        ResultCode::LimitReached,
        ResultCode::InvalidArgument,
        ResultCode::Abort,
        ResultCode::AlreadyExists,
        ResultCode::UnknownConfigOption,
        ResultCode::Busy,
        ResultCode::NotImplemented,
        ResultCode::EndOfInput,
        ResultCode::PermissionDenied,
        ResultCode::NoSuchMethod,
        ResultCode::Corrupt,
        ResultCode::Done,
        ResultCode::CompileError,
        ResultCode::VmError,
        ResultCode::Full,
        ResultCode::CantOpen,
        ResultCode::ReadOnly,
        ResultCode::LockProtocolError,
    ];

    /// Maps a native status value. Total: unrecognized values become
    /// [`ResultCode::Unknown`].
    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            sys::OK => Self::Ok,
            sys::NOMEM => Self::OutOfMemory,
            sys::IOERR => Self::IoError,
            sys::EMPTY => Self::Empty,
            sys::LOCKED => Self::Locked,
            sys::NOTFOUND => Self::NotFound,
            sys::LIMIT => Self::LimitReached,
            sys::INVALID => Self::InvalidArgument,
            sys::ABORT => Self::Abort,
            sys::EXISTS => Self::AlreadyExists,
            sys::UNKNOWN => Self::UnknownConfigOption,
            sys::BUSY => Self::Busy,
            sys::NOTIMPLEMENTED => Self::NotImplemented,
            sys::EOF => Self::EndOfInput,
            sys::PERM => Self::PermissionDenied,
            sys::NOOP => Self::NoSuchMethod,
            sys::CORRUPT => Self::Corrupt,
            sys::DONE => Self::Done,
            sys::COMPILE_ERR => Self::CompileError,
            sys::VM_ERR => Self::VmError,
            sys::FULL => Self::Full,
            sys::CANTOPEN => Self::CantOpen,
            sys::READ_ONLY => Self::ReadOnly,
            sys::LOCKERR => Self::LockProtocolError,
            _ => Self::Unknown,
        }
    }

    /// Returns the native value, `None` for [`ResultCode::Unknown`].
    pub fn as_raw(self) -> Option<c_int> {
        match self {
            Self::Unknown => None,
            code => Some(code as c_int),
        }
    }

    /// Returns true only for [`ResultCode::Ok`].
    pub fn is_success(self) -> bool {
        self == Self::Ok
    }

    /// Returns true when a read or delete found no record.
    ///
    /// Absence is a valid outcome, never an error.
    pub fn is_absent(self) -> bool {
        self == Self::NotFound
    }

    /// Returns true for commit failures that must not trigger a rollback.
    ///
    /// Busy and NotImplemented mean the engine could not attempt the commit,
    /// so pending changes are left in place for the caller to retry.
    pub fn skips_rollback(self) -> bool {
        matches!(self, Self::Busy | Self::NotImplemented)
    }

    /// Stable symbolic name, used when the engine provides no log text.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::OutOfMemory => "OutOfMemory",
            Self::IoError => "IOError",
            Self::Empty => "Empty",
            Self::Locked => "Locked",
            Self::NotFound => "NotFound",
            Self::LimitReached => "LimitReached",
            Self::InvalidArgument => "InvalidArgument",
            Self::Abort => "Abort",
            Self::AlreadyExists => "AlreadyExists",
            Self::UnknownConfigOption => "UnknownConfigOption",
            Self::Busy => "Busy",
            Self::NotImplemented => "NotImplemented",
            Self::EndOfInput => "EndOfInput",
            Self::PermissionDenied => "PermissionDenied",
            Self::NoSuchMethod => "NoSuchMethod",
            Self::Corrupt => "Corrupt",
            Self::Done => "Done",
            Self::CompileError => "CompileError",
            Self::VmError => "VMError",
            Self::Full => "Full",
            Self::CantOpen => "CantOpen",
            Self::ReadOnly => "ReadOnly",
            Self::LockProtocolError => "LockProtocolError",
            Self::Unknown => "Unknown",
        }
    }
}

impl From<c_int> for ResultCode {
    fn from(raw: c_int) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_survive_raw_conversion() {
        for code in ResultCode::KNOWN {
            let raw = code.as_raw().expect("known code has a native value");
            assert_eq!(ResultCode::from_raw(raw), code);
        }
    }

    #[test]
    fn native_values_are_bit_exact() {
        assert_eq!(ResultCode::Ok as i32, 0);
        assert_eq!(ResultCode::OutOfMemory as i32, -1);
        assert_eq!(ResultCode::NotFound as i32, -6);
        assert_eq!(ResultCode::Busy as i32, -14);
        assert_eq!(ResultCode::NotImplemented as i32, -17);
        assert_eq!(ResultCode::Corrupt as i32, -24);
        assert_eq!(ResultCode::CantOpen as i32, -74);
        assert_eq!(ResultCode::ReadOnly as i32, -75);
        assert_eq!(ResultCode::LockProtocolError as i32, -76);
    }

    #[test]
    fn unrecognized_values_map_to_unknown() {
        assert_eq!(ResultCode::from_raw(-5), ResultCode::Unknown);
        assert_eq!(ResultCode::from_raw(1), ResultCode::Unknown);
        assert_eq!(ResultCode::from_raw(-1000), ResultCode::Unknown);
        assert_eq!(ResultCode::Unknown.as_raw(), None);
    }

    #[test]
    fn only_ok_is_success() {
        for code in ResultCode::KNOWN {
            assert_eq!(code.is_success(), code == ResultCode::Ok);
        }
        assert!(!ResultCode::Unknown.is_success());
    }

    #[test]
    fn classification() {
        assert!(ResultCode::NotFound.is_absent());
        assert!(!ResultCode::Empty.is_absent());
        assert!(ResultCode::Busy.skips_rollback());
        assert!(ResultCode::NotImplemented.skips_rollback());
        assert!(!ResultCode::Corrupt.skips_rollback());
        assert!(!ResultCode::IoError.skips_rollback());
    }

    #[test]
    fn display_uses_symbolic_name() {
        assert_eq!(ResultCode::IoError.to_string(), "IOError");
        assert_eq!(ResultCode::VmError.to_string(), "VMError");
        assert_eq!(ResultCode::Unknown.to_string(), "Unknown");
    }
}
