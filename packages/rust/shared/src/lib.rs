//! Shared types, error model, and configuration for LeadScout.
//!
//! This crate is the foundation depended on by all other LeadScout crates.
//! It provides:
//! - [`LeadScoutError`], the unified error type
//! - Domain types ([`Company`], [`Icp`], [`SizeRange`], [`EnrichmentRecord`])
//! - Configuration ([`AppConfig`], [`PipelineSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, LlmConfig, OutreachConfig, PipelineSettings, WorkerConfig,
    config_dir, config_file_path, expand_home, init_config, load_config, load_config_from,
    resolve_api_key, validate_min_score,
};
pub use error::{LeadScoutError, Result};
pub use types::{
    Company, EnrichmentRecord, Icp, SNIPPET_MAX_CHARS, SizeRange, truncate_snippet,
};
