//! Group commands - create, delete, exists, owner, title

use super::CommandContext;
use anyhow::Result;
use dirgroup_core::{Filter, GroupAttributes};
use dirgroup_ldap::shape;
use serde_json::json;

pub async fn create(
    ctx: &CommandContext,
    code: &str,
    owner: &str,
    members: &[String],
    description: &str,
) -> Result<()> {
    let attributes = GroupAttributes::group_of_names(
        code,
        description,
        owner,
        members,
        ctx.service.group_member(),
    );

    ctx.service.create_group(code, &attributes).await?;

    let dn = ctx.service.dn(code);
    ctx.emit(&json!({ "created": dn }), || format!("Created {}", dn))
}

pub async fn delete(ctx: &CommandContext, code: &str) -> Result<()> {
    ctx.service.delete_group(code).await?;

    let dn = ctx.service.dn(code);
    ctx.emit(&json!({ "deleted": dn }), || format!("Deleted {}", dn))
}

pub async fn exists(ctx: &CommandContext, code: &str) -> Result<()> {
    let exists = ctx.service.group_exists(&Filter::group_named(code)).await?;
    ctx.emit(&json!({ "code": code, "exists": exists }), || exists.to_string())
}

pub async fn owner(ctx: &CommandContext, code: &str) -> Result<()> {
    let result = ctx
        .service
        .owner_for_group(code, &Filter::group_named(code), None)
        .await?;

    let owner = shape::owner_uid(&result);
    ctx.emit(&json!({ "code": code, "owner": owner }), || {
        owner.clone().unwrap_or_default()
    })
}

pub async fn title(ctx: &CommandContext, code: &str) -> Result<()> {
    let result = ctx
        .service
        .title_of_group(code, &Filter::group_named(code), None)
        .await?;

    let title = shape::title(&result);
    ctx.emit(&json!({ "code": code, "title": title }), || {
        title.clone().unwrap_or_default()
    })
}
