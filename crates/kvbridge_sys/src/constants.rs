//! Numeric constants of the native engine.
//!
//! These values are part of the engine ABI and must match its headers
//! exactly. They are kept as plain integers here; `kvbridge` lifts them into
//! typed enums and flag sets.

use std::os::raw::{c_int, c_uint};

// Result codes

/// Successful result.
pub const OK: c_int = 0;
/// Out of memory.
pub const NOMEM: c_int = -1;
/// I/O error.
pub const IOERR: c_int = -2;
/// Empty record or key.
pub const EMPTY: c_int = -3;
/// Locked operation.
pub const LOCKED: c_int = -4;
/// Record not found.
pub const NOTFOUND: c_int = -6;
/// Database limit reached.
pub const LIMIT: c_int = -7;
/// Invalid parameter.
pub const INVALID: c_int = -9;
/// Another thread released this instance.
pub const ABORT: c_int = -10;
/// Record exists.
pub const EXISTS: c_int = -11;
/// Unknown configuration option.
pub const UNKNOWN: c_int = -13;
/// The database file is locked by another process.
pub const BUSY: c_int = -14;
/// Method not implemented by the underlying storage engine.
pub const NOTIMPLEMENTED: c_int = -17;
/// End of input.
pub const EOF: c_int = -18;
/// Permission error.
pub const PERM: c_int = -19;
/// No such method.
pub const NOOP: c_int = -20;
/// Corrupt pointer or database image.
pub const CORRUPT: c_int = -24;
/// Operation done.
pub const DONE: c_int = -28;
/// Script compile error.
pub const COMPILE_ERR: c_int = -70;
/// Virtual machine error.
pub const VM_ERR: c_int = -71;
/// Full database.
pub const FULL: c_int = -73;
/// Unable to open the database file.
pub const CANTOPEN: c_int = -74;
/// Read-only key-value storage engine.
pub const READ_ONLY: c_int = -75;
/// Locking protocol error.
pub const LOCKERR: c_int = -76;

// Open mode flags

/// Open in read-only mode.
pub const OPEN_READONLY: c_uint = 0x0000_0001;
/// Open for reading and writing.
pub const OPEN_READWRITE: c_uint = 0x0000_0002;
/// Create the database if it does not exist.
pub const OPEN_CREATE: c_uint = 0x0000_0004;
/// Fail if the database file already exists.
pub const OPEN_EXCLUSIVE: c_uint = 0x0000_0008;
/// Temporary database, removed on close.
pub const OPEN_TEMP_DB: c_uint = 0x0000_0010;
/// Disable the engine's private mutexes.
pub const OPEN_NOMUTEX: c_uint = 0x0000_0020;
/// Disable journaling.
pub const OPEN_OMIT_JOURNALING: c_uint = 0x0000_0040;
/// In-memory database.
pub const OPEN_IN_MEMORY: c_uint = 0x0000_0080;
/// Read-only memory-mapped view of the file.
pub const OPEN_MMAP: c_uint = 0x0000_0100;

/// Path that selects an in-memory database.
pub const MEMORY_PATH: &str = ":mem:";

// Per-handle configuration verbs

/// Script compile error log (`const char **`, `int *`).
pub const CONFIG_JX9_ERR_LOG: c_int = 1;
/// Maximum number of cached pages (`int`).
pub const CONFIG_MAX_PAGE_CACHE: c_int = 2;
/// Database error log (`const char **`, `int *`).
pub const CONFIG_ERR_LOG: c_int = 3;
/// Switch storage engine (`const char *`).
pub const CONFIG_KV_ENGINE: c_int = 4;
/// Disable the engine's commit-on-close (no argument).
pub const CONFIG_DISABLE_AUTO_COMMIT: c_int = 5;
/// Name of the active storage engine (`const char **`).
pub const CONFIG_GET_KV_NAME: c_int = 6;

// Library-wide configuration verbs

/// Custom memory allocator.
pub const LIB_CONFIG_USER_MALLOC: c_int = 1;
/// Out-of-memory callback.
pub const LIB_CONFIG_MEM_ERR_CALLBACK: c_int = 2;
/// Custom mutex implementation.
pub const LIB_CONFIG_USER_MUTEX: c_int = 3;
/// Single-threaded operation.
pub const LIB_CONFIG_THREAD_LEVEL_SINGLE: c_int = 4;
/// Multi-threaded (serialized) operation.
pub const LIB_CONFIG_THREAD_LEVEL_MULTI: c_int = 5;
/// Custom virtual file system.
pub const LIB_CONFIG_VFS: c_int = 6;
/// Register a storage engine.
pub const LIB_CONFIG_STORAGE_ENGINE: c_int = 7;
/// Default page size (`int`).
pub const LIB_CONFIG_PAGE_SIZE: c_int = 8;
