//! Error types

use std::path::PathBuf;

use thiserror::Error;

use crate::property::PropertyId;

/// Registration and lookup failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupError {
    #[error("property {0} is not tracked by this group")]
    NotTracked(PropertyId),

    #[error("group '{0}' already belongs to another group")]
    AlreadyAttached(String),

    #[error("adding group '{0}' would make it its own descendant")]
    Cycle(String),

    #[error("no setting with id {0}")]
    UnknownSetting(usize),
}

/// Raised by [`PropertyGroup::apply`](crate::PropertyGroup::apply) when the
/// group is still dirty after committing
///
/// Listeners have already been notified when this is returned; the group is
/// left dirty and nothing is retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error(
        "group '{group}' still dirty after apply ({properties} properties, {lists} lists, {children} child groups differ)"
    )]
    StillDirty {
        group: String,
        properties: usize,
        lists: usize,
        children: usize,
    },

    #[error("apply failed in child group: {0}")]
    Child(#[source] Box<ApplyError>),
}

/// Config file load/save failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config")]
    Serialize(#[source] serde_json::Error),

    #[error("no config has been loaded yet")]
    NothingLoaded,

    #[error("no config file has been used yet")]
    NoPath,
}
