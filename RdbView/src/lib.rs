//! RdbView - browse RDB game-asset archives and export entries to disk
//!
//! Builds on [`rdbarchive`] with user configuration, export sessions, and
//! the `rdbview` command line.

// Re-export rdbarchive
pub use rdbarchive;

pub mod config;
pub mod error;
pub mod session;

// Feature-gated modules
#[cfg(feature = "cli")]
pub mod cli;

pub use config::{AppConfig, ExtractConfig};
pub use error::{Error, Result};
pub use session::{ExportSession, SessionControl};
