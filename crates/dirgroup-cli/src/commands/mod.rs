//! CLI command implementations

pub mod groups;
pub mod members;
pub mod users;

use crate::OutputFormat;
use anyhow::Result;
use dirgroup_core::DirectoryEntry;
use dirgroup_ldap::{DirectoryGroupService, LdapDirectory};
use serde::Serialize;
use std::sync::Arc;

/// Context passed to all commands
pub struct CommandContext {
    pub service: DirectoryGroupService,
    pub directory: Arc<LdapDirectory>,
    pub output_format: OutputFormat,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Print `value` as JSON, or `text` otherwise
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.is_json() {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }

    /// Print a list, one item per line in text mode
    pub fn emit_list(&self, items: &[String]) -> Result<()> {
        self.emit(&items, || items.join("\n"))
    }

    /// Print raw entries in LDIF-like form in text mode
    pub fn emit_entries(&self, entries: &[DirectoryEntry]) -> Result<()> {
        self.emit(&entries, || render_entries(entries))
    }
}

fn render_entries(entries: &[DirectoryEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let mut lines = vec![format!("dn: {}", entry.dn)];
            for (name, values) in &entry.attrs {
                lines.extend(values.iter().map(|v| format!("{}: {}", name, v)));
            }
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Serialize)]
struct PingResult {
    url: String,
    #[serde(flatten)]
    info: dirgroup_ldap::DirectoryServerInfo,
}

/// Query the root DSE and report the server details
pub async fn ping(ctx: &CommandContext) -> Result<()> {
    let info = ctx.directory.test_connection().await?;
    let result = PingResult {
        url: ctx.directory.settings().url(),
        info,
    };

    ctx.emit(&result, || {
        format!(
            "Connected to {}\nVendor: {}\nVersion: {}\nNaming contexts: {}",
            result.url,
            result.info.vendor.as_deref().unwrap_or("unknown"),
            result.info.version.as_deref().unwrap_or("unknown"),
            result.info.naming_contexts.join(", ")
        )
    })
}
