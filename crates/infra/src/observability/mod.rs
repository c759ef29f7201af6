//! Observability infrastructure
//!
//! Every crate logs through `tracing` macros. This module installs the
//! process-wide subscriber that decides where those events go.

pub mod logging;

pub use logging::{build_filter, init_tracing};
