//! # kvbridge_sys
//!
//! Raw foreign boundary of the embedded key-value engine.
//!
//! This crate provides:
//! - The opaque database handle type ([`RawDb`])
//! - The engine's numeric constants, bit-exact with its C headers
//! - The [`Engine`] trait, one method per native primitive
//! - [`NativeEngine`] (feature `native`), forwarding to the system library
//!
//! Nothing here interprets result codes or owns memory on behalf of the
//! caller. Marshaling, transactions and error mapping live in `kvbridge`.

#![warn(missing_docs)]

pub mod constants;
mod engine;
#[cfg(feature = "native")]
mod native;
mod types;

pub use engine::Engine;
#[cfg(feature = "native")]
pub use native::NativeEngine;
pub use types::{KvInt64, RawDb};
