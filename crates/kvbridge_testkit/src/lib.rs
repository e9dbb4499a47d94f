//! # kvbridge Testkit
//!
//! Test utilities for kvbridge.
//!
//! This crate provides:
//! - [`SimEngine`], a reference engine behind the raw [`Engine`] ABI
//! - Fault injection and call counters on that engine
//! - Temporary store fixtures
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kvbridge::Connection;
//! use kvbridge_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     let store = TempStore::new();
//!     let engine = SimEngine::new();
//!     let mut conn = Connection::open(engine.clone(), store.path(), Default::default()).unwrap();
//!     engine.inject(Fault::new(Op::Commit, -14));
//!     // ...
//! }
//! ```
//!
//! [`Engine`]: kvbridge_sys::Engine

#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
mod sim;
mod snapshot;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::sim::{CallCounts, Fault, LibraryState, Op, SimEngine};
}

pub use fixtures::*;
pub use generators::*;
pub use sim::{CallCounts, Fault, LibraryState, Op, SimEngine};
