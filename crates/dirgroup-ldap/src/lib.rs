//! Group management over an LDAP directory
//!
//! Provides:
//! - Group creation and deletion
//! - Membership changes
//! - Cached group lookups
//! - User lookups and existence checks

mod cache;
mod client;
mod memory;
mod service;
pub mod shape;

pub use cache::{CacheKey, Generation, GroupCache};
pub use client::{DirectoryServerInfo, LdapDirectory};
pub use memory::{MemoryDirectory, OperationCounts};
pub use service::DirectoryGroupService;
