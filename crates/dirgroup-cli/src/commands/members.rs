//! Membership commands - list, add, remove

use super::CommandContext;
use anyhow::Result;
use dirgroup_core::Filter;
use dirgroup_ldap::shape;
use serde_json::json;

pub async fn list(ctx: &CommandContext, code: &str) -> Result<()> {
    let member_attr = ctx.service.group_member();
    let result = ctx
        .service
        .users_for_group(code, &Filter::group_named(code), Some(&[member_attr]))
        .await?;

    ctx.emit_list(&shape::member_uids(&result, member_attr))
}

pub async fn add(ctx: &CommandContext, code: &str, users: &[String]) -> Result<()> {
    ctx.service.add_users_to_group(code, users).await?;
    ctx.emit(&json!({ "code": code, "added": users }), || {
        format!("Added {} user(s) to {}", users.len(), code)
    })
}

pub async fn remove(ctx: &CommandContext, code: &str, users: &[String]) -> Result<()> {
    ctx.service.remove_users_from_group(code, users).await?;
    ctx.emit(&json!({ "code": code, "removed": users }), || {
        format!("Removed {} user(s) from {}", users.len(), code)
    })
}
