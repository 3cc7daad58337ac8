//! Group service
//!
//! Translates group and user requests into single directory operations.
//! Group lookups made through [`DirectoryGroupService::find_group`] are
//! cached until a membership change on the same group invalidates them.
//! Mutations invalidate before and after the directory write, so a lookup
//! running alongside the write cannot leave its result cached.

use crate::cache::{CacheKey, GroupCache};
use crate::client::LdapDirectory;
use dirgroup_core::{
    uid_value, DirectoryClient, DirectoryEntry, DirectorySettings, Error, Filter,
    GroupAttributes, Modification, Result, OWNER_ATTRIBUTE,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Group CRUD, membership changes and lookups against one directory
pub struct DirectoryGroupService {
    client: Arc<dyn DirectoryClient>,
    settings: DirectorySettings,
    cache: GroupCache,
}

impl DirectoryGroupService {
    pub fn new(client: Arc<dyn DirectoryClient>, settings: &DirectorySettings) -> Self {
        Self {
            client,
            settings: settings.clone(),
            cache: GroupCache::new(),
        }
    }

    /// Service backed by an LDAP connection built from `settings`
    pub fn from_settings(settings: DirectorySettings) -> Self {
        let service = Self::new(Arc::new(LdapDirectory::new(settings.clone())), &settings);
        debug!(group_base = %service.settings.group_base, "Created group service");
        service
    }

    /// Attribute edited by membership changes
    pub fn group_member(&self) -> &str {
        &self.settings.group_member
    }

    /// `cn=<code>,<group_base>`
    pub fn dn(&self, code: &str) -> String {
        self.settings.group_dn(code)
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Create the group `code`. The attributes must carry members under the
    /// membership attribute and exactly one owner.
    pub async fn create_group(&self, code: &str, attributes: &GroupAttributes) -> Result<()> {
        if !attributes.has_values(&self.settings.group_member) {
            return Err(Error::NoUsers);
        }

        let owners = attributes
            .get(OWNER_ATTRIBUTE)
            .map(|values| values.iter().filter(|v| !v.is_empty()).count())
            .unwrap_or(0);
        match owners {
            0 => return Err(Error::MissingOwner),
            1 => {}
            n => {
                return Err(Error::InvalidArgument(format!(
                    "A group takes exactly one owner, got {}",
                    n
                )))
            }
        }

        let dn = self.dn(code);
        self.client.add(&dn, attributes).await?;

        info!(code, dn = %dn, "Created group");
        Ok(())
    }

    pub async fn delete_group(&self, code: &str) -> Result<()> {
        self.cache.invalidate(code).await;

        let dn = self.dn(code);
        self.client.delete(&dn).await?;
        self.cache.invalidate(code).await;

        info!(code, dn = %dn, "Deleted group");
        Ok(())
    }

    /// Groups matching `filter`. Defaults to requesting the membership
    /// attribute.
    pub async fn groups_for_user(
        &self,
        filter: &Filter,
        attributes: Option<&[&str]>,
    ) -> Result<Vec<DirectoryEntry>> {
        let attributes = attribute_list(attributes, &self.settings.group_member);
        self.client
            .search(&self.settings.group_base, filter, &attributes)
            .await
    }

    /// Groups matching `filter`. Defaults to requesting `cn`.
    pub async fn groups_owned_by_user(
        &self,
        filter: &Filter,
        attributes: Option<&[&str]>,
    ) -> Result<Vec<DirectoryEntry>> {
        let attributes = attribute_list(attributes, "cn");
        self.client
            .search(&self.settings.group_base, filter, &attributes)
            .await
    }

    /// Cached group lookup requesting `description` by default
    pub async fn title_of_group(
        &self,
        code: &str,
        filter: &Filter,
        attributes: Option<&[&str]>,
    ) -> Result<Vec<DirectoryEntry>> {
        self.find_group(code, filter, &attribute_list(attributes, "description"))
            .await
    }

    /// Cached group lookup requesting `member` by default
    pub async fn users_for_group(
        &self,
        code: &str,
        filter: &Filter,
        attributes: Option<&[&str]>,
    ) -> Result<Vec<DirectoryEntry>> {
        self.find_group(code, filter, &attribute_list(attributes, "member"))
            .await
    }

    /// Cached group lookup requesting `owner` by default
    pub async fn owner_for_group(
        &self,
        code: &str,
        filter: &Filter,
        attributes: Option<&[&str]>,
    ) -> Result<Vec<DirectoryEntry>> {
        self.find_group(code, filter, &attribute_list(attributes, OWNER_ATTRIBUTE))
            .await
    }

    /// Search the group base for `filter`, caching non-empty results under
    /// (code, filter, attributes)
    pub async fn find_group(
        &self,
        code: &str,
        filter: &Filter,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>> {
        let key = CacheKey::new(code, filter, attributes);
        if let Some(result) = self.cache.get(&key).await {
            debug!(code, "Group lookup served from cache");
            return Ok(result);
        }

        let generation = self.cache.generation(code).await;

        let result = self
            .client
            .search(&self.settings.group_base, filter, attributes)
            .await?;

        if result.is_empty() {
            return Err(Error::GroupNotFound(code.to_string()));
        }

        self.cache.insert(key, result.clone(), generation).await;
        Ok(result)
    }

    // =========================================================================
    // Membership
    // =========================================================================

    pub async fn add_users_to_group<S: AsRef<str>>(&self, code: &str, users: &[S]) -> Result<()> {
        self.change_members(code, users, Modification::add).await
    }

    pub async fn remove_users_from_group<S: AsRef<str>>(
        &self,
        code: &str,
        users: &[S],
    ) -> Result<()> {
        self.change_members(code, users, Modification::delete).await
    }

    /// Drop every cached lookup for `code`
    pub async fn invalidate_cache(&self, code: &str) {
        self.cache.invalidate(code).await;
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        info!("Group cache cleared");
    }

    /// Number of cached group lookups
    pub async fn cached_lookups(&self) -> usize {
        self.cache.len().await
    }

    /// Send one modify holding a change per user, invalidating `code` on
    /// both sides of it
    async fn change_members<S, F>(&self, code: &str, users: &[S], change: F) -> Result<()>
    where
        S: AsRef<str>,
        F: Fn(String, String) -> Modification,
    {
        self.cache.invalidate(code).await;

        if users.is_empty() {
            debug!(code, "No users given, skipping modify");
            return Ok(());
        }

        let modifications: Vec<Modification> = users
            .iter()
            .map(|user| change(self.settings.group_member.clone(), uid_value(user.as_ref())))
            .collect();

        let dn = self.dn(code);
        self.client.modify(&dn, &modifications).await?;
        self.cache.invalidate(code).await;

        info!(code, users = users.len(), "Updated group membership");
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Search the tree base for `filter`
    pub async fn get_user(
        &self,
        filter: &Filter,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>> {
        let attributes: Vec<String> = attributes.iter().map(|a| a.to_string()).collect();
        self.client.search(&self.settings.base, filter, &attributes).await
    }

    /// At least one entry under the tree base matches `filter`
    pub async fn user_exists(&self, filter: &Filter) -> Result<bool> {
        Ok(!self.client.search(&self.settings.base, filter, &[]).await?.is_empty())
    }

    /// Exactly one entry under the tree base matches `filter`
    pub async fn is_user_unique(&self, filter: &Filter) -> Result<bool> {
        Ok(self.client.search(&self.settings.base, filter, &[]).await?.len() == 1)
    }

    /// Exactly one entry under the group base matches `filter`
    pub async fn group_exists(&self, filter: &Filter) -> Result<bool> {
        Ok(self.client.search(&self.settings.group_base, filter, &[]).await?.len() == 1)
    }
}

fn attribute_list(attributes: Option<&[&str]>, default: &str) -> Vec<String> {
    match attributes {
        Some(attributes) => attributes.iter().map(|a| a.to_string()).collect(),
        None => vec![default.to_string()],
    }
}
