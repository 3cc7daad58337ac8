//! User commands - show, exists, group listings

use super::CommandContext;
use anyhow::Result;
use dirgroup_core::Filter;
use dirgroup_ldap::shape;
use serde_json::json;

pub async fn show(ctx: &CommandContext, uid: &str, attributes: &[String]) -> Result<()> {
    let attributes: Vec<&str> = attributes.iter().map(String::as_str).collect();
    let entries = ctx
        .service
        .get_user(&Filter::eq("uid", uid), &attributes)
        .await?;

    ctx.emit_entries(&entries)
}

pub async fn exists(ctx: &CommandContext, uid: &str) -> Result<()> {
    let filter = Filter::eq("uid", uid);
    let exists = ctx.service.user_exists(&filter).await?;
    let unique = exists && ctx.service.is_user_unique(&filter).await?;

    ctx.emit(&json!({ "uid": uid, "exists": exists, "unique": unique }), || {
        format!("exists: {}\nunique: {}", exists, unique)
    })
}

pub async fn groups_for(ctx: &CommandContext, uid: &str) -> Result<()> {
    let filter = Filter::groups_with_member(ctx.service.group_member(), uid);
    let result = ctx.service.groups_for_user(&filter, Some(&["cn"])).await?;

    ctx.emit_list(&shape::common_names(&result))
}

pub async fn groups_owned(ctx: &CommandContext, uid: &str) -> Result<()> {
    let result = ctx
        .service
        .groups_owned_by_user(&Filter::groups_owned_by(uid), None)
        .await?;

    ctx.emit_list(&shape::common_names(&result))
}
