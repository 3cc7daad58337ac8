//! dirgroup Core Library
//!
//! Configuration, error type, filter and entry types, and the
//! `DirectoryClient` seam shared by the group service and its clients.

pub mod config;
pub mod directory;
pub mod error;
pub mod types;

pub use config::DirectorySettings;
pub use directory::DirectoryClient;
pub use error::{Error, Result};
pub use types::{DirectoryEntry, Filter, GroupAttributes, Modification};

/// dirgroup version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Attribute holding a group's owner
pub const OWNER_ATTRIBUTE: &str = "owner";

/// Prefix applied to user identifiers stored in member and owner values
pub const UID_PREFIX: &str = "uid=";

/// Format a user identifier the way member and owner values store it
pub fn uid_value(user: &str) -> String {
    format!("{}{}", UID_PREFIX, user)
}

/// Strip the `uid=` prefix from a stored member or owner value
pub fn strip_uid(value: &str) -> &str {
    value.strip_prefix(UID_PREFIX).unwrap_or(value)
}
