//! Directory entries and attribute sets

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entry returned by a directory search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Distinguished name
    pub dn: String,

    /// Attribute values by attribute name
    #[serde(default)]
    pub attrs: BTreeMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_values<I, V>(mut self, attr: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.attrs
            .insert(attr.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// All values of `attr`, matching the name case-insensitively
    pub fn values(&self, attr: &str) -> &[String] {
        self.attrs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attr))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// First value of `attr`
    pub fn first(&self, attr: &str) -> Option<&str> {
        self.values(attr).first().map(String::as_str)
    }

    /// Copy of the entry restricted to `attrs`. An empty list keeps every
    /// attribute.
    pub fn project(&self, attrs: &[String]) -> Self {
        if attrs.is_empty() {
            return self.clone();
        }

        let attrs = self
            .attrs
            .iter()
            .filter(|(name, _)| attrs.iter().any(|a| a.eq_ignore_ascii_case(name)))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect();

        Self {
            dn: self.dn.clone(),
            attrs,
        }
    }
}

/// Attributes supplied when creating a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupAttributes(BTreeMap<String, Vec<String>>);

impl GroupAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conventional `groupOfNames` attribute set. An empty description is
    /// left out, since directories reject empty string values.
    pub fn group_of_names<S: AsRef<str>>(
        code: &str,
        description: &str,
        owner: &str,
        users: &[S],
        member_attr: &str,
    ) -> Self {
        let mut attrs = Self::new()
            .with("cn", [code])
            .with("objectClass", ["groupOfNames"])
            .with(
                member_attr,
                users.iter().map(|u| crate::uid_value(u.as_ref())),
            )
            .with(crate::OWNER_ATTRIBUTE, [crate::uid_value(owner)]);

        if !description.is_empty() {
            attrs.insert("description", [description]);
        }
        attrs
    }

    /// Builder-style setter; replaces existing values of `attr`
    pub fn with<I, V>(mut self, attr: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.insert(attr, values);
        self
    }

    pub fn insert<I, V>(&mut self, attr: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.0
            .insert(attr.into(), values.into_iter().map(Into::into).collect());
    }

    /// Values of `attr`, matching the name case-insensitively
    pub fn get(&self, attr: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attr))
            .map(|(_, values)| values.as_slice())
    }

    /// True when `attr` is present with at least one non-empty value
    pub fn has_values(&self, attr: &str) -> bool {
        self.get(attr)
            .map(|values| values.iter().any(|v| !v.is_empty()))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entry with these attributes stored under `dn`
    pub fn into_entry(self, dn: impl Into<String>) -> DirectoryEntry {
        DirectoryEntry {
            dn: dn.into(),
            attrs: self.0,
        }
    }
}

/// Single change within a modify request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Modification {
    /// Add `value` to `attribute`
    Add { attribute: String, value: String },

    /// Remove `value` from `attribute`
    Delete { attribute: String, value: String },
}

impl Modification {
    pub fn add(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Modification::Add {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn delete(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Modification::Delete {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn attribute(&self) -> &str {
        match self {
            Modification::Add { attribute, .. } | Modification::Delete { attribute, .. } => {
                attribute
            }
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Modification::Add { value, .. } | Modification::Delete { value, .. } => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_of_names() {
        let attrs = GroupAttributes::group_of_names(
            "eng",
            "Engineering",
            "alice",
            &["alice", "bob"],
            "uniquemember",
        );

        assert_eq!(attrs.get("cn").unwrap(), ["eng"]);
        assert_eq!(attrs.get("uniqueMember").unwrap(), ["uid=alice", "uid=bob"]);
        assert_eq!(attrs.get("owner").unwrap(), ["uid=alice"]);
        assert!(attrs.has_values("objectclass"));
        assert_eq!(attrs.get("description").unwrap(), ["Engineering"]);
    }

    #[test]
    fn test_group_of_names_omits_empty_description() {
        let attrs = GroupAttributes::group_of_names("eng", "", "alice", &["alice"], "member");
        assert!(attrs.get("description").is_none());
        assert!(attrs.has_values("member"));
    }

    #[test]
    fn test_has_values_ignores_empty() {
        let attrs = GroupAttributes::new()
            .with("member", Vec::<String>::new())
            .with("owner", [""]);
        assert!(!attrs.has_values("member"));
        assert!(!attrs.has_values("owner"));
        assert!(!attrs.has_values("description"));
    }

    #[test]
    fn test_entry_lookup_and_projection() {
        let entry = DirectoryEntry::new("cn=eng,ou=groups,dc=example,dc=com")
            .with_values("description", ["Engineering"])
            .with_values("member", ["uid=alice"]);

        assert_eq!(entry.first("Description"), Some("Engineering"));
        assert!(entry.values("owner").is_empty());

        let projected = entry.project(&["member".to_string()]);
        assert_eq!(projected.attrs.len(), 1);
        assert_eq!(projected.dn, entry.dn);
        assert_eq!(entry.project(&[]), entry);
    }
}
