pub mod repo;
pub mod head;
pub mod link;
pub mod events;

// Re-exports for convenience
pub use repo::*;
pub use head::*;
pub use link::*;
pub use events::*;
