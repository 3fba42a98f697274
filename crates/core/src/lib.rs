//! headsync core - discovery and synchronization of repository heads
//!
//! This crate enumerates the branches, tags and pull requests of a remote
//! repository, decides which of them are wanted, keeps an observer's view of
//! them current and maps accepted heads to checkout configurations. Remote
//! access, credentials and storage are reached only through ports; adapters
//! live in the application crate.

pub mod domain;
pub mod ports;
pub mod behavior;
pub mod cancel;
pub mod app;
pub mod error;

// Re-exports for ergonomics
pub use domain::*;
pub use error::*;
