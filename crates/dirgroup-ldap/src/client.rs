//! LDAP client implementation
//!
//! ldap3-backed `DirectoryClient`. The connection is opened and bound on
//! first use and the handle is reused for every later request until
//! [`LdapDirectory::unbind`] closes it.

use async_trait::async_trait;
use dirgroup_core::{
    DirectoryClient, DirectoryEntry, DirectorySettings, Error, Filter, GroupAttributes,
    Modification, Result,
};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Mod, Scope, SearchEntry};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Root DSE details reported by [`LdapDirectory::test_connection`]
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryServerInfo {
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub naming_contexts: Vec<String>,
    pub supported_ldap_version: Vec<String>,
}

/// Directory client speaking LDAP through ldap3
pub struct LdapDirectory {
    settings: DirectorySettings,
    connection: OnceCell<Ldap>,
}

impl LdapDirectory {
    pub fn new(settings: DirectorySettings) -> Self {
        Self {
            settings,
            connection: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &DirectorySettings {
        &self.settings
    }

    /// Query the root DSE over the shared connection
    pub async fn test_connection(&self) -> Result<DirectoryServerInfo> {
        let mut ldap = self.connection().await?;

        let (rs, _res) = ldap
            .search(
                "",
                Scope::Base,
                "(objectClass=*)",
                vec![
                    "vendorName",
                    "vendorVersion",
                    "namingContexts",
                    "supportedLDAPVersion",
                ],
            )
            .await
            .map_err(map_ldap_error)?
            .success()
            .map_err(map_ldap_error)?;

        let info = match rs.into_iter().next() {
            Some(result) => {
                let entry = SearchEntry::construct(result);
                DirectoryServerInfo {
                    vendor: get_first_attr(&entry, "vendorName"),
                    version: get_first_attr(&entry, "vendorVersion"),
                    naming_contexts: entry
                        .attrs
                        .get("namingContexts")
                        .cloned()
                        .unwrap_or_default(),
                    supported_ldap_version: entry
                        .attrs
                        .get("supportedLDAPVersion")
                        .cloned()
                        .unwrap_or_default(),
                }
            }
            None => DirectoryServerInfo {
                vendor: None,
                version: None,
                naming_contexts: vec![],
                supported_ldap_version: vec!["3".to_string()],
            },
        };

        Ok(info)
    }

    /// Unbind the shared connection if one was opened. Failures are logged,
    /// not returned.
    pub async fn unbind(&self) {
        let Some(ldap) = self.connection.get() else {
            debug!("No LDAP connection to unbind");
            return;
        };

        let mut ldap = ldap.clone();
        match ldap.unbind().await {
            Ok(()) => debug!(url = %self.settings.url(), "LDAP connection unbound"),
            Err(e) => warn!(error = %e, "Error during LDAP unbind"),
        }
    }

    /// Handle to the shared connection, opening it on first use
    async fn connection(&self) -> Result<Ldap> {
        let ldap = self
            .connection
            .get_or_try_init(|| self.connect())
            .await?;

        Ok(ldap.clone())
    }

    async fn connect(&self) -> Result<Ldap> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.settings.timeout_seconds))
            .set_starttls(self.settings.start_tls);

        let url = self.settings.url();
        debug!("Connecting to LDAP server: {}", url);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| Error::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        ldap3::drive!(conn);

        if let Some((username, password)) = self.settings.bind_credentials() {
            ldap.simple_bind(username, password)
                .await
                .map_err(map_ldap_error)?
                .success()
                .map_err(map_ldap_error)?;
            debug!("Bound to LDAP server as {}", username);
        }

        info!(url = %url, "LDAP connection established");
        Ok(ldap)
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectory {
    async fn search(
        &self,
        base: &str,
        filter: &Filter,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>> {
        let mut ldap = self.connection().await?;
        let filter = filter.to_string();
        let attrs: Vec<&str> = attributes.iter().map(String::as_str).collect();

        debug!(base, filter = %filter, ?attrs, "LDAP search");

        let (rs, _res) = ldap
            .search(base, Scope::Subtree, &filter, attrs)
            .await
            .map_err(map_ldap_error)?
            .success()
            .map_err(map_ldap_error)?;

        let entries: Vec<DirectoryEntry> = rs
            .into_iter()
            .map(|result| {
                let entry = SearchEntry::construct(result);
                DirectoryEntry {
                    dn: entry.dn,
                    attrs: entry.attrs.into_iter().collect(),
                }
            })
            .collect();

        debug!("Search returned {} entries", entries.len());
        Ok(entries)
    }

    async fn add(&self, dn: &str, attributes: &GroupAttributes) -> Result<()> {
        let mut ldap = self.connection().await?;

        let attrs: Vec<(&str, HashSet<&str>)> = attributes
            .iter()
            .map(|(name, values)| {
                (
                    name.as_str(),
                    values.iter().map(String::as_str).collect(),
                )
            })
            .collect();

        ldap.add(dn, attrs)
            .await
            .map_err(map_ldap_error)?
            .success()
            .map_err(map_ldap_error)?;

        info!(dn, "LDAP entry created");
        Ok(())
    }

    async fn delete(&self, dn: &str) -> Result<()> {
        let mut ldap = self.connection().await?;

        ldap.delete(dn)
            .await
            .map_err(map_ldap_error)?
            .success()
            .map_err(map_ldap_error)?;

        info!(dn, "LDAP entry deleted");
        Ok(())
    }

    async fn modify(&self, dn: &str, modifications: &[Modification]) -> Result<()> {
        let mut ldap = self.connection().await?;

        let mods: Vec<Mod<&str>> = modifications
            .iter()
            .map(|m| match m {
                Modification::Add { attribute, value } => {
                    Mod::Add(attribute.as_str(), HashSet::from([value.as_str()]))
                }
                Modification::Delete { attribute, value } => {
                    Mod::Delete(attribute.as_str(), HashSet::from([value.as_str()]))
                }
            })
            .collect();

        ldap.modify(dn, mods)
            .await
            .map_err(map_ldap_error)?
            .success()
            .map_err(map_ldap_error)?;

        info!(dn, changes = modifications.len(), "LDAP entry modified");
        Ok(())
    }
}

/// Server result codes pass through as `Error::Directory`; everything else
/// is a connection failure
fn map_ldap_error(err: LdapError) -> Error {
    match err {
        LdapError::LdapResult { result } => Error::Directory {
            rc: result.rc,
            text: result.text,
        },
        other => Error::Connection(other.to_string()),
    }
}

/// Helper to get first attribute value from LDAP entry
fn get_first_attr(entry: &SearchEntry, attr: &str) -> Option<String> {
    entry.attrs.get(attr).and_then(|v| v.first().cloned())
}
