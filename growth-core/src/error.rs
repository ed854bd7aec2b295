//! Error types for growth-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the generation core.
///
/// Growth and sampling themselves never fail on finite input; errors only
/// come from picking out of empty collections and from loading or
/// validating [`crate::config::Settings`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("collection must have at least one element")]
    EmptyCollection,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
