//! Connection configuration.

use crate::mode::OpenMode;

/// Configuration for opening a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Open mode passed to the engine.
    pub mode: OpenMode,

    /// Maximum number of pages the engine may cache (`None` = engine default).
    pub max_page_cache: Option<u32>,

    /// Whether mutations are committed right after they succeed.
    pub auto_commit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: OpenMode::default(),
            max_page_cache: None,
            auto_commit: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the open mode.
    #[must_use]
    pub const fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the page cache limit.
    #[must_use]
    pub const fn max_page_cache(mut self, pages: u32) -> Self {
        self.max_page_cache = Some(pages);
        self
    }

    /// Sets the initial auto-commit state.
    #[must_use]
    pub const fn auto_commit(mut self, value: bool) -> Self {
        self.auto_commit = value;
        self
    }
}
