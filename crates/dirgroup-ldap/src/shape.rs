//! Helpers that pull the usual values out of raw group lookups

use dirgroup_core::{strip_uid, DirectoryEntry, OWNER_ATTRIBUTE};

/// First `description` of the first entry
pub fn title(entries: &[DirectoryEntry]) -> Option<String> {
    entries
        .first()
        .and_then(|entry| entry.first("description"))
        .map(str::to_string)
}

/// User identifiers stored in `member_attr` of the first entry
pub fn member_uids(entries: &[DirectoryEntry], member_attr: &str) -> Vec<String> {
    entries
        .first()
        .map(|entry| {
            entry
                .values(member_attr)
                .iter()
                .map(|v| strip_uid(v).to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Owner of the first entry
pub fn owner_uid(entries: &[DirectoryEntry]) -> Option<String> {
    entries
        .first()
        .and_then(|entry| entry.first(OWNER_ATTRIBUTE))
        .map(|v| strip_uid(v).to_string())
}

/// First `cn` of every entry
pub fn common_names(entries: &[DirectoryEntry]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| entry.first("cn"))
        .map(str::to_string)
        .collect()
}
