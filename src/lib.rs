#![forbid(unsafe_code)]

//! Change tracking for settings dialogs
//!
//! UI controls expose their state as [`Property`] and [`ListProperty`]
//! values. A [`PropertyGroup`] watches those values, remembers what was last
//! applied, and answers "is anything dirty?" for a whole tree of groups.
//! `apply` commits the edits, `reset` discards them.
//!
//! - [`settings`]: named settings tree with OK / Apply / Cancel
//! - [`config`]: JSON load/save of a config object bound to the live state

pub mod config;
pub mod constants;
pub mod error;
pub mod group;
pub mod list_property;
pub mod property;
pub mod settings;

pub use config::{ConfigBinding, ConfigManager};
pub use error::{ApplyError, ConfigError, GroupError};
pub use group::{Equality, ListenerId, PropertyGroup};
pub use list_property::{ListChange, ListKey, ListProperty};
pub use property::{Property, PropertyId, PropertyKey, Subscription};
pub use settings::{Setting, SettingId, SettingsDialog};
