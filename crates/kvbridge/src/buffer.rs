//! Call-scoped byte regions for keys and values.
//!
//! The engine takes every key and value as a pointer plus a length. This
//! module turns a logical input ([`Datum`]) into such a region and hands it
//! to a closure; the region is reclaimed when the closure returns, so its
//! address can never outlive the native call made inside it.
//!
//! Inputs that are already UTF-8 or raw bytes are borrowed as-is. Inputs
//! that must be re-encoded (UTF-16 text) are written either into a stack
//! array, when the encoded length fits the small-buffer threshold, or into a
//! heap buffer of exactly the encoded length. Both paths yield identical
//! bytes; the choice only affects allocation.

use crate::error::{Error, Result};
use kvbridge_sys::KvInt64;
use std::os::raw::c_int;

/// Largest encoded key kept on the stack.
pub const KEY_INLINE_CAPACITY: usize = 128;

/// Largest encoded value kept on the stack.
pub const VALUE_INLINE_CAPACITY: usize = 512;

/// Largest key length accepted by the engine (`int` length parameter).
pub const MAX_KEY_LEN: usize = c_int::MAX as usize;

/// A logical key or value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datum<'a> {
    /// UTF-8 text.
    Text(&'a str),
    /// UTF-16 text, as produced by foreign callers. May hold unpaired
    /// surrogates, which fail to encode.
    Utf16(&'a [u16]),
    /// Raw bytes, passed through unchanged.
    Bytes(&'a [u8]),
}

impl<'a> Datum<'a> {
    /// Creates a byte window of `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the window exceeds `bytes`.
    pub fn window(bytes: &'a [u8], offset: usize, len: usize) -> Result<Self> {
        let end = offset.checked_add(len).filter(|&end| end <= bytes.len());
        match end {
            Some(end) => Ok(Self::Bytes(&bytes[offset..end])),
            None => Err(Error::OutOfBounds {
                offset,
                len,
                available: bytes.len(),
            }),
        }
    }

    /// Returns the length of the UTF-8 encoding of this datum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] for malformed UTF-16.
    pub fn encoded_len(&self) -> Result<usize> {
        match self {
            Self::Text(text) => Ok(text.len()),
            Self::Bytes(bytes) => Ok(bytes.len()),
            Self::Utf16(units) => utf16_encoded_len(units),
        }
    }
}

impl<'a> From<&'a str> for Datum<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a String> for Datum<'a> {
    fn from(text: &'a String) -> Self {
        Self::Text(text.as_str())
    }
}

impl<'a> From<&'a [u8]> for Datum<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Datum<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self::Bytes(bytes.as_slice())
    }
}

impl<'a> From<&'a Vec<u8>> for Datum<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self::Bytes(bytes.as_slice())
    }
}

impl<'a> From<&'a [u16]> for Datum<'a> {
    fn from(units: &'a [u16]) -> Self {
        Self::Utf16(units)
    }
}

/// Where a scoped region lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The caller's own bytes, no copy.
    Borrowed,
    /// A stack array bounded by the small-buffer threshold.
    Inline,
    /// A heap buffer of exactly the encoded length.
    Heap,
}

/// A byte region valid for one closure invocation.
#[derive(Debug, Clone, Copy)]
pub struct ScopedBytes<'s> {
    bytes: &'s [u8],
    placement: Placement,
}

impl<'s> ScopedBytes<'s> {
    /// Returns the encoded bytes.
    #[must_use]
    pub fn as_slice(&self) -> &'s [u8] {
        self.bytes
    }

    /// Returns the encoded length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for a zero-length region.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns where the region lives.
    #[must_use]
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Start address for the native call. Never null, even when empty.
    pub(crate) fn as_ptr(&self) -> *const std::os::raw::c_void {
        self.bytes.as_ptr().cast()
    }
}

/// Encodes `datum` and runs `f` over the resulting region.
///
/// Regions whose encoded length is at most `INLINE` bytes are built on the
/// stack; longer ones on the heap. The region is released when `f` returns.
///
/// # Errors
///
/// Returns [`Error::Encoding`] for malformed UTF-16.
pub fn with_scoped_bytes<const INLINE: usize, R>(
    datum: Datum<'_>,
    f: impl FnOnce(ScopedBytes<'_>) -> R,
) -> Result<R> {
    let units = match datum {
        Datum::Text(text) => {
            return Ok(f(ScopedBytes {
                bytes: text.as_bytes(),
                placement: Placement::Borrowed,
            }))
        }
        Datum::Bytes(bytes) => {
            return Ok(f(ScopedBytes {
                bytes,
                placement: Placement::Borrowed,
            }))
        }
        Datum::Utf16(units) => units,
    };

    let len = utf16_encoded_len(units)?;
    if len <= INLINE {
        let mut inline = [0u8; INLINE];
        let written = encode_utf16(units, &mut inline[..len]);
        debug_assert_eq!(written, len);
        Ok(f(ScopedBytes {
            bytes: &inline[..len],
            placement: Placement::Inline,
        }))
    } else {
        let mut heap = vec![0u8; len];
        let written = encode_utf16(units, &mut heap);
        debug_assert_eq!(written, len);
        Ok(f(ScopedBytes {
            bytes: &heap,
            placement: Placement::Heap,
        }))
    }
}

/// Scopes a key: non-empty, at most [`MAX_KEY_LEN`] bytes, stack-allocated
/// up to [`KEY_INLINE_CAPACITY`].
///
/// # Errors
///
/// Returns [`Error::Encoding`], [`Error::EmptyKey`] or [`Error::KeyTooLarge`].
pub fn with_key_bytes<R>(
    key: Datum<'_>,
    f: impl FnOnce(ScopedBytes<'_>, c_int) -> R,
) -> Result<R> {
    with_scoped_bytes::<KEY_INLINE_CAPACITY, _>(key, |scoped| {
        if scoped.is_empty() {
            return Err(Error::EmptyKey);
        }
        let len = c_int::try_from(scoped.len()).map_err(|_| Error::KeyTooLarge {
            len: scoped.len(),
            max: MAX_KEY_LEN,
        })?;
        Ok(f(scoped, len))
    })?
}

/// Scopes a value: any length that fits the engine's 64-bit length,
/// stack-allocated up to [`VALUE_INLINE_CAPACITY`]. Empty values are valid.
///
/// # Errors
///
/// Returns [`Error::Encoding`] or [`Error::ValueTooLarge`].
pub fn with_value_bytes<R>(
    value: Datum<'_>,
    f: impl FnOnce(ScopedBytes<'_>, KvInt64) -> R,
) -> Result<R> {
    with_scoped_bytes::<VALUE_INLINE_CAPACITY, _>(value, |scoped| {
        let len = KvInt64::try_from(scoped.len())
            .map_err(|_| Error::ValueTooLarge { len: scoped.len() })?;
        Ok(f(scoped, len))
    })?
}

fn utf16_encoded_len(units: &[u16]) -> Result<usize> {
    let mut position = 0;
    let mut len = 0;
    for decoded in char::decode_utf16(units.iter().copied()) {
        let ch = decoded.map_err(|_| Error::Encoding { position })?;
        position += ch.len_utf16();
        len += ch.len_utf8();
    }
    Ok(len)
}

/// Writes the UTF-8 encoding of already validated `units` into `out`.
fn encode_utf16(units: &[u16], out: &mut [u8]) -> usize {
    let mut written = 0;
    for ch in char::decode_utf16(units.iter().copied()).flatten() {
        written += ch.encode_utf8(&mut out[written..]).len();
    }
    written
}
