pub mod remote;
pub mod observer;
pub mod auth;
pub mod persistence;

// Re-exports
pub use remote::*;
pub use observer::*;
pub use auth::*;
pub use persistence::*;
