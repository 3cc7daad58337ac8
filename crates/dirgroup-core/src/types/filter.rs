//! Typed search filters
//!
//! Filters render to RFC 4515 text for the wire and can also be evaluated
//! against in-memory entries.

use super::DirectoryEntry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directory search filter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Attribute has the given value
    Equals { attribute: String, value: String },

    /// Attribute has any value
    Present { attribute: String },

    /// All sub-filters match
    And { filters: Vec<Filter> },

    /// Any sub-filter matches
    Or { filters: Vec<Filter> },

    /// Sub-filter does not match
    Not { filter: Box<Filter> },
}

impl Filter {
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    pub fn negate(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// Combine with another filter using AND, flattening an existing AND
    pub fn and_with(self, other: Filter) -> Self {
        match self {
            Filter::And { mut filters } => {
                filters.push(other);
                Filter::And { filters }
            }
            _ => Filter::And {
                filters: vec![self, other],
            },
        }
    }

    /// `(&(objectClass=groupOfNames)(<member_attr>=uid=<user>))`
    pub fn groups_with_member(member_attr: &str, user: &str) -> Self {
        Filter::eq("objectClass", "groupOfNames")
            .and_with(Filter::eq(member_attr, crate::uid_value(user)))
    }

    /// `(&(objectClass=groupOfNames)(owner=uid=<user>))`
    pub fn groups_owned_by(user: &str) -> Self {
        Filter::eq("objectClass", "groupOfNames")
            .and_with(Filter::eq(crate::OWNER_ATTRIBUTE, crate::uid_value(user)))
    }

    /// `(&(objectClass=groupOfNames)(cn=<code>))`
    pub fn group_named(code: &str) -> Self {
        Filter::eq("objectClass", "groupOfNames").and_with(Filter::eq("cn", code))
    }

    /// Evaluate against an entry. Attribute names and values compare
    /// ASCII-case-insensitively.
    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            Filter::Equals { attribute, value } => entry
                .values(attribute)
                .iter()
                .any(|v| v.eq_ignore_ascii_case(value)),
            Filter::Present { attribute } => !entry.values(attribute).is_empty(),
            Filter::And { filters } => filters.iter().all(|f| f.matches(entry)),
            Filter::Or { filters } => filters.iter().any(|f| f.matches(entry)),
            Filter::Not { filter } => !filter.matches(entry),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Equals { attribute, value } => {
                write!(f, "({}={})", attribute, escape_value(value))
            }
            Filter::Present { attribute } => write!(f, "({}=*)", attribute),
            Filter::And { filters } => {
                f.write_str("(&")?;
                for inner in filters {
                    write!(f, "{}", inner)?;
                }
                f.write_str(")")
            }
            Filter::Or { filters } => {
                f.write_str("(|")?;
                for inner in filters {
                    write!(f, "{}", inner)?;
                }
                f.write_str(")")
            }
            Filter::Not { filter } => write!(f, "(!{})", filter),
        }
    }
}

/// Escape special characters in filter values (RFC 4515)
pub fn escape_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_entry() -> DirectoryEntry {
        DirectoryEntry::new("cn=eng,ou=groups,dc=example,dc=com")
            .with_values("objectClass", ["top", "groupOfNames"])
            .with_values("cn", ["eng"])
            .with_values("member", ["uid=alice", "uid=bob"])
    }

    #[test]
    fn test_render() {
        let filter = Filter::groups_with_member("member", "vanessa");
        assert_eq!(
            filter.to_string(),
            "(&(objectClass=groupOfNames)(member=uid=vanessa))"
        );
        assert_eq!(Filter::present("owner").to_string(), "(owner=*)");
        assert_eq!(
            Filter::negate(Filter::eq("cn", "a")).to_string(),
            "(!(cn=a))"
        );
    }

    #[test]
    fn test_render_escapes_values() {
        let filter = Filter::eq("cn", "a*(b)\\");
        assert_eq!(filter.to_string(), "(cn=a\\2a\\28b\\29\\5c)");
    }

    #[test]
    fn test_and_with_flattens() {
        let filter = Filter::eq("a", "1")
            .and_with(Filter::eq("b", "2"))
            .and_with(Filter::eq("c", "3"));
        match filter {
            Filter::And { filters } => assert_eq!(filters.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_matches() {
        let entry = group_entry();
        assert!(Filter::groups_with_member("member", "alice").matches(&entry));
        assert!(Filter::groups_with_member("MEMBER", "BOB").matches(&entry));
        assert!(!Filter::groups_with_member("member", "carol").matches(&entry));
        assert!(!Filter::present("owner").matches(&entry));
        assert!(Filter::or(vec![Filter::eq("cn", "ops"), Filter::eq("cn", "eng")]).matches(&entry));
        assert!(Filter::negate(Filter::present("owner")).matches(&entry));
    }
}
