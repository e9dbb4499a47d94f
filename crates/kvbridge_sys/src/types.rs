//! Type definitions for the foreign boundary.

/// An opaque database handle.
///
/// This is the engine's internal connection structure.
/// Never dereference or modify directly.
#[repr(C)]
pub struct RawDb {
    _private: [u8; 0],
}

/// The engine's 64-bit length type (`long long` in C).
pub type KvInt64 = i64;
