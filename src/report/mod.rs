//! Text rendering of analysis findings.

pub mod format;

pub use format::*;
