//! Configuration module for Policy-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use policy_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Repository root: {}", config.storage.root.display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, ExportConfig, HttpConfig, SiteConfig, StorageConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config};
