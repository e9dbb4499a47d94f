//! Engine diagnostics: error log retrieval and failure enrichment.

use crate::error::Error;
use crate::result_code::ResultCode;
use kvbridge_sys::{Engine, RawDb};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::ptr::{self, NonNull};

/// Reads the engine's error log for `db`.
///
/// Returns `None` when the query fails or the log is empty. The text is
/// copied out before returning; the engine may reuse its buffer on the next
/// call.
pub(crate) fn error_log<E: Engine>(engine: &E, db: NonNull<RawDb>) -> Option<String> {
    let mut log: *const c_char = ptr::null();
    let mut len: c_int = 0;
    // SAFETY: `db` is live for the duration of this call and both out
    // pointers reference locals.
    let rc = unsafe { engine.config_err_log(db.as_ptr(), &mut log, &mut len) };
    if rc != kvbridge_sys::constants::OK {
        return None;
    }
    let len = usize::try_from(len).ok().filter(|&len| len > 0)?;
    // SAFETY: the engine guarantees `log` is valid for `len` bytes until the
    // next call on this handle; we copy before making another.
    unsafe { lossy_text(log, Some(len)) }
}

/// Copies engine-owned text into an owned string.
///
/// With `len`, exactly that many bytes are read; otherwise the text is read
/// up to its null terminator. Trailing newlines and nulls are dropped and
/// empty text yields `None`.
///
/// # Safety
///
/// `text` must be null or valid for `len` bytes (or up to a null terminator
/// when `len` is `None`).
pub(crate) unsafe fn lossy_text(text: *const c_char, len: Option<usize>) -> Option<String> {
    if text.is_null() {
        return None;
    }
    let bytes = match len {
        Some(len) => std::slice::from_raw_parts(text.cast::<u8>(), len),
        None => CStr::from_ptr(text).to_bytes(),
    };
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_end_matches(['\0', '\n', '\r']);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Builds an engine error, preferring the log text over the code name.
pub(crate) fn engine_error(raw: c_int, log: Option<String>) -> Error {
    let code = ResultCode::from_raw(raw);
    let message = log.unwrap_or_else(|| code.name().to_owned());
    Error::engine(code, raw, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lossy_text_trims_terminators() {
        let raw = b"Read-only database\n\0";
        let text = unsafe { lossy_text(raw.as_ptr().cast(), Some(raw.len())) };
        assert_eq!(text.as_deref(), Some("Read-only database"));
    }

    #[test]
    fn lossy_text_reads_to_terminator() {
        let raw = b"unqlite 1.1.9\0trailing";
        let text = unsafe { lossy_text(raw.as_ptr().cast(), None) };
        assert_eq!(text.as_deref(), Some("unqlite 1.1.9"));
    }

    #[test]
    fn empty_or_null_text_is_absent() {
        assert_eq!(unsafe { lossy_text(ptr::null(), None) }, None);
        let raw = b"\n\0";
        assert_eq!(unsafe { lossy_text(raw.as_ptr().cast(), Some(2)) }, None);
    }

    #[test]
    fn lossy_text_replaces_invalid_utf8() {
        let raw = [b'a', 0xFF, b'b'];
        let text = unsafe { lossy_text(raw.as_ptr().cast(), Some(3)) };
        assert_eq!(text.as_deref(), Some("a\u{FFFD}b"));
    }

    #[test]
    fn engine_error_prefers_log() {
        let err = engine_error(-75, Some("Read-only database".to_owned()));
        assert_eq!(err.code(), Some(ResultCode::ReadOnly));
        assert_eq!(err.to_string(), "ReadOnly: Read-only database");
    }

    #[test]
    fn engine_error_falls_back_to_code_name() {
        let err = engine_error(-14, None);
        assert_eq!(err.to_string(), "Busy: Busy");

        let err = engine_error(-999, None);
        assert!(matches!(
            err,
            Error::Engine {
                code: ResultCode::Unknown,
                raw: -999,
                ..
            }
        ));
    }
}
