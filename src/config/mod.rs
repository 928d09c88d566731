//! Configuration module for Ripple-Parse
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; a missing file section falls back to the defaults.
//!
//! # Example
//!
//! ```no_run
//! use ripple_parse::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ripple.toml")).unwrap();
//! println!("Strict no-follow: {}", config.parser.robots_no_follow_strict);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DispatcherConfig, FilterEntry, MetadataConfig, NormalizerConfig, ParserConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
