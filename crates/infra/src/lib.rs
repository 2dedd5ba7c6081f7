//! Studiomap Infrastructure Library
//!
//! Process-wide services shared by the binaries: for now the tracing
//! subscriber setup.

pub mod logger;

pub use logger::*;

/// Infrastructure version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
