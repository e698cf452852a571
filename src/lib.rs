//! smartfile - sequential, extension-based file renaming
//!
//! This library discovers files in a source directory, groups them by
//! extension, and copies or moves each group into a target directory under
//! names rendered from per-extension naming patterns (`img_01.jpg`,
//! `img_02.jpg`, ...). Patterns and discovery filters can also be read from a
//! TOML configuration file.

pub mod cli;
pub mod config;
pub mod file_organizer;
pub mod naming_pattern;
pub mod output;
pub mod transfer;

pub use config::{CompiledFilters, Config, ConfigError};
pub use file_organizer::{
    ExtensionCounts, FileGroups, OrganizeError, OrganizeReport, Organizer, normalize_extension,
};
pub use naming_pattern::{NamingPattern, PatternError};
pub use transfer::TransferMode;

pub use cli::{Cli, run_cli};
