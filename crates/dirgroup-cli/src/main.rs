//! dirgroup - directory group management
//!
//! Operator CLI over the group service: create and delete groups, change
//! membership, and run the usual lookups against the configured directory.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use dirgroup_core::DirectorySettings;
use dirgroup_ldap::{DirectoryGroupService, LdapDirectory};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dirgroup")]
#[command(author = "Dirgroup Team")]
#[command(version = dirgroup_core::VERSION)]
#[command(about = "Manage directory groups over LDAP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Application root holding config/dirgroup.yml
    #[arg(long, global = true, env = "DIRGROUP_ROOT", default_value = ".")]
    root: String,

    /// Settings section to use
    #[arg(short, long, global = true, env = "DIRGROUP_ENV", default_value = "test")]
    env: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "DIRGROUP_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a group
    CreateGroup {
        /// Group code
        code: String,
        /// Owner uid
        #[arg(long)]
        owner: String,
        /// Member uid (repeatable)
        #[arg(long = "member", required = true)]
        members: Vec<String>,
        /// Group description
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a group
    DeleteGroup { code: String },

    /// Add users to a group
    AddUsers {
        code: String,
        #[arg(required = true)]
        users: Vec<String>,
    },

    /// Remove users from a group
    RemoveUsers {
        code: String,
        #[arg(required = true)]
        users: Vec<String>,
    },

    /// List the members of a group
    Members { code: String },

    /// Show the owner of a group
    Owner { code: String },

    /// Show the description of a group
    Title { code: String },

    /// List groups a user belongs to
    GroupsForUser { uid: String },

    /// List groups a user owns
    GroupsOwned { uid: String },

    /// Show a user's entry
    User {
        uid: String,
        /// Attribute to return (repeatable, default all)
        #[arg(long = "attr")]
        attributes: Vec<String>,
    },

    /// Check whether a user exists and is unique
    UserExists { uid: String },

    /// Check whether exactly one group has this code
    GroupExists { code: String },

    /// Query the directory root DSE
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let settings = DirectorySettings::load(&cli.root, &cli.env)?;
    debug!(env = %cli.env, url = %settings.url(), "Loaded directory settings");

    let directory = Arc::new(LdapDirectory::new(settings.clone()));
    let ctx = CommandContext {
        service: DirectoryGroupService::new(directory.clone(), &settings),
        directory,
        output_format: cli.output,
    };

    let result = match cli.command {
        Commands::CreateGroup {
            code,
            owner,
            members,
            description,
        } => {
            let description = description.unwrap_or_default();
            commands::groups::create(&ctx, &code, &owner, &members, &description).await
        }
        Commands::DeleteGroup { code } => commands::groups::delete(&ctx, &code).await,
        Commands::AddUsers { code, users } => commands::members::add(&ctx, &code, &users).await,
        Commands::RemoveUsers { code, users } => {
            commands::members::remove(&ctx, &code, &users).await
        }
        Commands::Members { code } => commands::members::list(&ctx, &code).await,
        Commands::Owner { code } => commands::groups::owner(&ctx, &code).await,
        Commands::Title { code } => commands::groups::title(&ctx, &code).await,
        Commands::GroupsForUser { uid } => commands::users::groups_for(&ctx, &uid).await,
        Commands::GroupsOwned { uid } => commands::users::groups_owned(&ctx, &uid).await,
        Commands::User { uid, attributes } => commands::users::show(&ctx, &uid, &attributes).await,
        Commands::UserExists { uid } => commands::users::exists(&ctx, &uid).await,
        Commands::GroupExists { code } => commands::groups::exists(&ctx, &code).await,
        Commands::Ping => commands::ping(&ctx).await,
    };

    ctx.directory.unbind().await;
    result
}
