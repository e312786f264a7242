// All parsing functionality is in pasteparse-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod report;
pub mod sources;

// Re-export core types for convenience
pub use pasteparse_core::*;

// Re-export CLI utilities
pub use report::{OutputFormat, Report};
