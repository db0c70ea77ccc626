//! Bookstore Application Library
//!
//! Hosts the catalog modules and the [`Application`] bootstrap shared by the
//! `bookstore-app` binary and the `bookstore` CLI.

pub mod app;
pub mod modules;

/// Re-export commonly used types
pub use app::Application;
pub use modules::*;
