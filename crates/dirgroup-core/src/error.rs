//! Error types for dirgroup

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Group Errors
    #[error("Unable to persist a group without users")]
    NoUsers,

    #[error("Unable to persist a group without owner")]
    MissingOwner,

    #[error("Can't find group '{0}' in ldap")]
    GroupNotFound(String),

    // Validation Errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Directory Errors
    #[error("Directory connection failed: {0}")]
    Connection(String),

    /// Non-success result returned by the directory server.
    #[error("Directory operation failed with code {rc}: {text}")]
    Directory { rc: u32, text: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// LDAP result code for an entry that already exists.
    pub const RC_ALREADY_EXISTS: u32 = 68;

    /// LDAP result code for a missing entry.
    pub const RC_NO_SUCH_OBJECT: u32 = 32;

    pub fn code(&self) -> &'static str {
        match self {
            Error::NoUsers => "NoUsers",
            Error::MissingOwner => "MissingOwner",
            Error::GroupNotFound(_) => "GroupNotFound",
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::Config(_) => "ConfigError",
            Error::Connection(_) => "ConnectionError",
            Error::Directory { rc, .. } if *rc == Self::RC_ALREADY_EXISTS => "EntryAlreadyExists",
            Error::Directory { rc, .. } if *rc == Self::RC_NO_SUCH_OBJECT => "NoSuchObject",
            Error::Directory { .. } => "DirectoryError",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }

    /// Shorthand for a directory result error.
    pub fn directory(rc: u32, text: impl Into<String>) -> Self {
        Error::Directory {
            rc,
            text: text.into(),
        }
    }

    /// True for the errors raised by group validation and lookup rather than
    /// by the directory itself.
    pub fn is_group_error(&self) -> bool {
        matches!(
            self,
            Error::NoUsers | Error::MissingOwner | Error::GroupNotFound(_)
        )
    }
}
