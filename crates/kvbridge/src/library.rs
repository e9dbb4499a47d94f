//! Process-wide library lifecycle.
//!
//! The engine keeps global state (threading mode, default page size) that
//! must be set up before the first database is opened. Re-running
//! [`configure_library`] forwards the settings to the engine again; how the
//! engine treats a second initialization is up to the engine.

use crate::diagnostics::{engine_error, lossy_text};
use crate::error::{Error, Result};
use kvbridge_sys::constants::OK;
use kvbridge_sys::Engine;
use std::os::raw::c_int;
use std::sync::OnceLock;
use tracing::debug;

/// The first configuration applied in this process.
static CONFIGURED: OnceLock<LibraryConfig> = OnceLock::new();

/// Process-wide engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Serialize access to shared engine state across threads.
    pub thread_safe: bool,
    /// Default page size in bytes (`None` = engine default).
    pub page_size: Option<u32>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            thread_safe: true,
            page_size: None,
        }
    }
}

impl LibraryConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the threading mode.
    #[must_use]
    pub const fn thread_safe(mut self, value: bool) -> Self {
        self.thread_safe = value;
        self
    }

    /// Sets the default page size.
    #[must_use]
    pub const fn page_size(mut self, bytes: u32) -> Self {
        self.page_size = Some(bytes);
        self
    }
}

/// Applies the process-wide settings and initializes the library.
///
/// Call once, before the first connection is opened. Settings are applied
/// in order: threading mode, page size, then initialization. The first
/// call stops at the first setting the engine refuses.
pub fn configure_library<E: Engine>(engine: &E, config: &LibraryConfig) -> Result<()> {
    if let Some(previous) = CONFIGURED.get() {
        debug!(?previous, requested = ?config, "library already configured; reapplying");
    }

    check(engine.lib_config_thread_level(config.thread_safe))?;
    if let Some(bytes) = config.page_size {
        check(engine.lib_config_page_size(Error::int_setting("page size", bytes)?))?;
    }
    check(engine.lib_init())?;

    if CONFIGURED.set(config.clone()).is_ok() {
        debug!(
            thread_safe = config.thread_safe,
            page_size = ?config.page_size,
            "library initialized"
        );
    }
    Ok(())
}

/// Returns the first configuration successfully applied in this process.
#[must_use]
pub fn configured_library() -> Option<&'static LibraryConfig> {
    CONFIGURED.get()
}

/// Releases the engine's global resources.
///
/// Every connection must be closed first.
pub fn shutdown_library<E: Engine>(engine: &E) -> Result<()> {
    check(engine.lib_shutdown())?;
    debug!("library shut down");
    Ok(())
}

/// Build identification reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LibraryInfo {
    /// Version string, e.g. `1.1.9`.
    pub version: String,
    /// Signature string.
    pub signature: String,
    /// Storage engine identification.
    pub ident: String,
    /// Copyright notice.
    pub copyright: String,
    /// Whether the library was compiled thread-safe.
    pub thread_safe: bool,
}

/// Queries the engine's build identification.
#[must_use]
pub fn library_info<E: Engine>(engine: &E) -> LibraryInfo {
    // SAFETY: the lib_* strings are static and null-terminated (or null).
    let text = |ptr| unsafe { lossy_text(ptr, None) }.unwrap_or_default();
    LibraryInfo {
        version: text(engine.lib_version()),
        signature: text(engine.lib_signature()),
        ident: text(engine.lib_ident()),
        copyright: text(engine.lib_copyright()),
        thread_safe: engine.lib_is_threadsafe() != 0,
    }
}

fn check(rc: c_int) -> Result<()> {
    if rc == OK {
        Ok(())
    } else {
        Err(engine_error(rc, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result_code::ResultCode;
    use kvbridge_testkit::SimEngine;

    #[test]
    fn builder_pattern() {
        let config = LibraryConfig::new().thread_safe(false).page_size(8192);
        assert!(!config.thread_safe);
        assert_eq!(config.page_size, Some(8192));
    }

    #[test]
    fn configure_applies_settings_then_initializes() {
        let engine = SimEngine::new();
        let config = LibraryConfig::new().page_size(4096);
        configure_library(&engine, &config).unwrap();

        let lib = engine.library();
        assert_eq!(lib.multi_threaded, Some(true));
        assert_eq!(lib.page_size, Some(4096));
        assert_eq!(lib.inits, 1);
        assert!(configured_library().is_some());
    }

    #[test]
    fn refused_page_size_stops_before_init() {
        let engine = SimEngine::new();
        let err = configure_library(&engine, &LibraryConfig::new().page_size(1000)).unwrap_err();
        assert_eq!(err.code(), Some(ResultCode::InvalidArgument));
        assert_eq!(engine.library().inits, 0);
    }

    #[test]
    fn oversized_page_size_is_rejected_locally() {
        let engine = SimEngine::new();
        let config = LibraryConfig::new().page_size(u32::MAX);
        let err = configure_library(&engine, &config).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { setting: "page size", .. }));
        let lib = engine.library();
        assert_eq!(lib.page_size, None);
        assert_eq!(lib.inits, 0);
    }

    #[test]
    fn info_reports_build() {
        let info = library_info(&SimEngine::new());
        assert!(!info.version.is_empty());
        assert!(!info.ident.is_empty());
        assert!(info.thread_safe);
    }

    #[test]
    fn shutdown_is_forwarded() {
        let engine = SimEngine::new();
        shutdown_library(&engine).unwrap();
        assert_eq!(engine.library().shutdowns, 1);
    }
}
