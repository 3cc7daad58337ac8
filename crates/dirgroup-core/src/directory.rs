//! Directory client trait
//!
//! Defines the interface the group service issues its requests through.
//! Implementations exist for ldap3 and for an in-memory directory.

use crate::types::{DirectoryEntry, Filter, GroupAttributes, Modification};
use crate::Result;
use async_trait::async_trait;

/// Directory client trait
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Subtree search under `base`. An empty `attributes` list requests
    /// every user attribute.
    async fn search(
        &self,
        base: &str,
        filter: &Filter,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>>;

    async fn add(&self, dn: &str, attributes: &GroupAttributes) -> Result<()>;

    async fn delete(&self, dn: &str) -> Result<()>;

    /// Apply all `modifications` to `dn` in a single request
    async fn modify(&self, dn: &str, modifications: &[Modification]) -> Result<()>;
}
