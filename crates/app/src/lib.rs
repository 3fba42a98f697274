//! headsync application library
//!
//! Adapters, services and the composition root of the `headsync` binary,
//! exposed for testing and external usage.

pub mod adapters;
pub mod cli;
pub mod runner;
pub mod services;
