pub mod build;
pub mod commands;
pub mod projection;
pub mod request;
pub mod retriever;
pub mod source;

// Re-exports
pub use build::*;
pub use commands::*;
pub use projection::*;
pub use request::*;
pub use retriever::*;
pub use source::*;
