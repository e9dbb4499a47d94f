//! # kvbridge
//!
//! Safe access layer over an embedded key-value engine reached through its
//! C ABI.
//!
//! This crate provides:
//! - Call-scoped key/value buffers with a small-buffer fast path
//! - A closed model of the engine's result codes
//! - [`Connection`], owning one native handle, with `try_*` and throwing
//!   variants of fetch, store, append and delete
//! - Auto-commit with rollback on commit failure, and scoped
//!   [`Transaction`] guards
//! - Error enrichment from the engine's error log
//! - Process-wide library configuration
//!
//! The engine is abstracted by [`Engine`]. With the `native` feature,
//! [`NativeEngine`] links the system library; `kvbridge_testkit` provides an
//! in-process engine for tests.
//!
//! ```ignore
//! use kvbridge::{Connection, NativeEngine, OpenMode};
//!
//! let mut conn = Connection::open(NativeEngine, "app.db", OpenMode::default())?;
//! conn.store("greeting", "hello")?;
//! assert_eq!(conn.fetch_string("greeting")?.as_deref(), Some("hello"));
//!
//! let mut txn = conn.begin_transaction()?;
//! txn.append("log", b"entry\n")?;
//! txn.commit()?;
//! ```

#![warn(missing_docs)]

pub mod buffer;
mod config;
mod connection;
mod diagnostics;
mod error;
mod library;
mod mode;
mod result_code;
mod stats;
mod transaction;

pub use buffer::{Datum, Placement, ScopedBytes};
pub use config::Config;
pub use connection::Connection;
pub use error::{Error, Result};
pub use library::{
    configure_library, configured_library, library_info, shutdown_library, LibraryConfig,
    LibraryInfo,
};
pub use mode::OpenMode;
pub use result_code::ResultCode;
pub use stats::{ConnectionStats, StatsSnapshot};
pub use transaction::Transaction;

pub use kvbridge_sys::Engine;
#[cfg(feature = "native")]
pub use kvbridge_sys::NativeEngine;
