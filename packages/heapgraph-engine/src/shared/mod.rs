//! Shared module - Common types and utilities
//!
//! Types shared across all features. Carries no traversal logic and no
//! heavyweight dependencies.

pub mod cancel;
pub mod models;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use models::*;
