//! Shared declarations for the Loom environment registry.
//!
//! Everything here is a closed, compile-time set: lifecycle phases, the
//! execution side, and the boolean option hierarchy. Runtime state lives in
//! `loom-core`.
//!
//! # Modules
//!
//! - [`enums`] -- [`Phase`] and [`Side`]
//! - [`options`] -- [`EnvOption`] and the option namespace

pub mod enums;
pub mod options;

pub use enums::{Phase, Side};
pub use options::{EnvOption, NAMESPACE};
