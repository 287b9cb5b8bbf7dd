//! Bookshelf application library
//!
//! The book catalog module, shelf pagination helpers and the application
//! bootstrap shared by the server and CLI binaries.

pub mod app;
pub mod modules;
pub mod utils;

/// Re-export commonly used types
pub use app::Application;
pub use modules::*;
