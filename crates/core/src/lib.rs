//! vtscan-core
//!
//! Core library for recovering C++ virtual function tables from the static
//! memory image of a stripped 64-bit binary.
//!
//! This crate defines the data model, the image accessor abstraction (plus an
//! in-memory implementation and a goblin-backed loader), the ABI-specific
//! pointer classifiers and scanners, and the exporters for the vtable record
//! format consumed by downstream class-hierarchy tooling.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends (CLI, scripting bindings, etc.).

pub mod model;
pub mod config;
pub mod error;
pub mod image;
pub mod analysis;
pub mod services;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
