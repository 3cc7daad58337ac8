//! In-memory directory
//!
//! A `DirectoryClient` holding entries in a map, for hosts that need a
//! directory in tests or local development. Result codes follow LDAP:
//! adding an existing DN fails with 68, touching a missing DN with 32.

use async_trait::async_trait;
use dirgroup_core::{
    DirectoryClient, DirectoryEntry, Error, Filter, GroupAttributes, Modification, Result,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

const RC_NO_SUCH_ATTRIBUTE: u32 = 16;
const RC_ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;

/// Number of requests served, by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub searches: usize,
    pub adds: usize,
    pub deletes: usize,
    pub modifies: usize,
}

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    entries: RwLock<BTreeMap<String, DirectoryEntry>>,
    searches: AtomicUsize,
    adds: AtomicUsize,
    deletes: AtomicUsize,
    modifies: AtomicUsize,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory pre-populated with `entries`
    pub fn with_entries(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (normalize_dn(&entry.dn), entry))
            .collect();

        Self {
            entries: RwLock::new(entries),
            ..Default::default()
        }
    }

    /// Insert or replace an entry without counting it as a request
    pub async fn insert(&self, entry: DirectoryEntry) {
        self.entries
            .write()
            .await
            .insert(normalize_dn(&entry.dn), entry);
    }

    pub async fn entry(&self, dn: &str) -> Option<DirectoryEntry> {
        self.entries.read().await.get(&normalize_dn(dn)).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn counts(&self) -> OperationCounts {
        OperationCounts {
            searches: self.searches.load(Ordering::SeqCst),
            adds: self.adds.load(Ordering::SeqCst),
            deletes: self.deletes.load(Ordering::SeqCst),
            modifies: self.modifies.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl DirectoryClient for MemoryDirectory {
    async fn search(
        &self,
        base: &str,
        filter: &Filter,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        debug!(base, filter = %filter, "Memory search");

        let base = normalize_dn(base);
        let entries = self.entries.read().await;

        Ok(entries
            .iter()
            .filter(|(dn, _)| in_subtree(dn, &base))
            .filter(|(_, entry)| filter.matches(entry))
            .map(|(_, entry)| entry.project(attributes))
            .collect())
    }

    async fn add(&self, dn: &str, attributes: &GroupAttributes) -> Result<()> {
        self.adds.fetch_add(1, Ordering::SeqCst);

        let key = normalize_dn(dn);
        let mut entries = self.entries.write().await;
        if entries.contains_key(&key) {
            return Err(Error::directory(
                Error::RC_ALREADY_EXISTS,
                format!("Entry already exists: {}", dn),
            ));
        }

        entries.insert(key, attributes.clone().into_entry(dn));
        Ok(())
    }

    async fn delete(&self, dn: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);

        match self.entries.write().await.remove(&normalize_dn(dn)) {
            Some(_) => Ok(()),
            None => Err(no_such_object(dn)),
        }
    }

    async fn modify(&self, dn: &str, modifications: &[Modification]) -> Result<()> {
        self.modifies.fetch_add(1, Ordering::SeqCst);

        let key = normalize_dn(dn);
        let mut entries = self.entries.write().await;
        let current = entries.get(&key).ok_or_else(|| no_such_object(dn))?;

        // Applied to a copy so a failing change leaves the entry untouched
        let mut updated = current.clone();
        for modification in modifications {
            apply(&mut updated, modification)?;
        }

        entries.insert(key, updated);
        Ok(())
    }
}

fn apply(entry: &mut DirectoryEntry, modification: &Modification) -> Result<()> {
    let name = entry
        .attrs
        .keys()
        .find(|name| name.eq_ignore_ascii_case(modification.attribute()))
        .cloned()
        .unwrap_or_else(|| modification.attribute().to_string());
    let value = modification.value();

    match modification {
        Modification::Add { .. } => {
            let values = entry.attrs.entry(name.clone()).or_default();
            if values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
                return Err(Error::directory(
                    RC_ATTRIBUTE_OR_VALUE_EXISTS,
                    format!("{} already has value {}", name, value),
                ));
            }
            values.push(value.to_string());
        }
        Modification::Delete { .. } => {
            let values = entry.attrs.get_mut(&name);
            let position = values
                .as_ref()
                .and_then(|values| values.iter().position(|v| v.eq_ignore_ascii_case(value)));

            match (values, position) {
                (Some(values), Some(index)) => {
                    values.remove(index);
                    if values.is_empty() {
                        entry.attrs.remove(&name);
                    }
                }
                _ => {
                    return Err(Error::directory(
                        RC_NO_SUCH_ATTRIBUTE,
                        format!("{} has no value {}", name, value),
                    ))
                }
            }
        }
    }

    Ok(())
}

fn no_such_object(dn: &str) -> Error {
    Error::directory(Error::RC_NO_SUCH_OBJECT, format!("No such object: {}", dn))
}

/// Split a DN on the commas that separate RDNs; `\,` stays in its value
fn split_rdns(dn: &str) -> Vec<&str> {
    let mut rdns = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, c) in dn.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ',' => {
                rdns.push(&dn[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    rdns.push(&dn[start..]);
    rdns
}

fn normalize_dn(dn: &str) -> String {
    split_rdns(dn)
        .iter()
        .map(|rdn| rdn.trim().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

/// Both DNs must already be normalized
fn in_subtree(dn: &str, base: &str) -> bool {
    base.is_empty() || split_rdns(dn).ends_with(&split_rdns(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(code: &str, members: &[&str]) -> DirectoryEntry {
        DirectoryEntry::new(format!("cn={},ou=groups,dc=example,dc=com", code))
            .with_values("objectClass", ["groupOfNames"])
            .with_values("cn", [code])
            .with_values("member", members.iter().map(|m| format!("uid={}", m)))
    }

    #[tokio::test]
    async fn test_search_respects_base_and_filter() {
        let directory = MemoryDirectory::with_entries([
            group("eng", &["alice"]),
            group("ops", &["bob"]),
            DirectoryEntry::new("uid=alice,ou=people,dc=example,dc=com")
                .with_values("uid", ["alice"]),
        ]);

        let groups = directory
            .search("ou=groups,dc=example,dc=com", &Filter::present("cn"), &[])
            .await
            .unwrap();
        assert_eq!(groups.len(), 2);

        let people = directory
            .search("OU=People, DC=example, DC=com", &Filter::eq("uid", "alice"), &[])
            .await
            .unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(directory.counts().searches, 2);
    }

    #[tokio::test]
    async fn test_add_existing_fails() {
        let directory = MemoryDirectory::new();
        let attrs = GroupAttributes::new().with("cn", ["eng"]);
        let dn = "cn=eng,ou=groups,dc=example,dc=com";

        directory.add(dn, &attrs).await.unwrap();
        let err = directory.add(dn, &attrs).await.unwrap_err();
        assert_eq!(err.code(), "EntryAlreadyExists");
    }

    #[tokio::test]
    async fn test_modify_is_all_or_nothing() {
        let directory = MemoryDirectory::with_entries([group("eng", &["alice"])]);
        let dn = "cn=eng,ou=groups,dc=example,dc=com";

        let err = directory
            .modify(
                dn,
                &[
                    Modification::add("member", "uid=bob"),
                    Modification::delete("member", "uid=carol"),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Directory { rc: 16, .. }));

        let entry = directory.entry(dn).await.unwrap();
        assert_eq!(entry.values("member"), ["uid=alice"]);
    }

    #[test]
    fn test_normalize_dn_keeps_escaped_commas() {
        assert_eq!(
            normalize_dn(r"CN=Smith\, John, OU=People,dc=example,dc=com"),
            r"cn=smith\, john,ou=people,dc=example,dc=com"
        );
        assert_eq!(split_rdns(r"cn=a\\,ou=x"), vec![r"cn=a\\", "ou=x"]);
    }

    #[tokio::test]
    async fn test_escaped_commas_do_not_change_subtree() {
        let directory = MemoryDirectory::with_entries([
            group("eng", &["alice"]),
            DirectoryEntry::new(r"cn=Smith\, John,ou=people,dc=example,dc=com")
                .with_values("cn", ["Smith, John"]),
            DirectoryEntry::new(r"cn=lookalike\,ou=groups,dc=example,dc=com")
                .with_values("cn", ["lookalike,ou=groups"]),
        ]);

        let person = directory
            .entry(r"cn=smith\, john,ou=People,dc=example,dc=com")
            .await
            .expect("escaped DN found");
        assert_eq!(person.first("cn"), Some("Smith, John"));

        let groups = directory
            .search("ou=groups,dc=example,dc=com", &Filter::present("cn"), &[])
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].dn, "cn=eng,ou=groups,dc=example,dc=com");

        let people = directory
            .search("ou=people,dc=example,dc=com", &Filter::present("cn"), &[])
            .await
            .unwrap();
        assert_eq!(people.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_fails() {
        let directory = MemoryDirectory::new();
        let err = directory
            .delete("cn=ghost,ou=groups,dc=example,dc=com")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NoSuchObject");
        assert_eq!(directory.counts().deletes, 1);
    }
}
