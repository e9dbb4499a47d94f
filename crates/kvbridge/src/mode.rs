//! Open mode flags.

use bitflags::bitflags;
use kvbridge_sys::constants as sys;

bitflags! {
    /// How a database is opened. Values match the engine's open flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenMode: u32 {
        /// Read-only access.
        const READ_ONLY = sys::OPEN_READONLY;
        /// Read and write access.
        const READ_WRITE = sys::OPEN_READWRITE;
        /// Create the database if it does not exist.
        const CREATE = sys::OPEN_CREATE;
        /// Fail if the database already exists.
        const EXCLUSIVE = sys::OPEN_EXCLUSIVE;
        /// Temporary database, removed on close.
        const TEMP_DB = sys::OPEN_TEMP_DB;
        /// Disable the engine's private mutexes.
        const NO_MUTEX = sys::OPEN_NOMUTEX;
        /// Disable journaling.
        const OMIT_JOURNALING = sys::OPEN_OMIT_JOURNALING;
        /// In-memory database.
        const IN_MEMORY = sys::OPEN_IN_MEMORY;
        /// Read-only memory-mapped view.
        const MMAP = sys::OPEN_MMAP;
    }
}

impl Default for OpenMode {
    /// Read-write, creating the database when missing.
    fn default() -> Self {
        Self::READ_WRITE | Self::CREATE
    }
}

impl OpenMode {
    /// Returns true if writes are refused by this mode.
    #[must_use]
    pub fn is_read_only(self) -> bool {
        self.intersects(Self::READ_ONLY | Self::MMAP)
    }
}
