//! Shared types, error model, and configuration for lessonpath.
//!
//! This crate is the foundation depended on by all other lessonpath crates.
//! It provides:
//! - [`LessonpathError`], the unified error type
//! - Domain types ([`VideoRecord`], [`LearningPathway`], [`ModelProfile`], [`RunId`])
//! - Configuration ([`AppConfig`], [`ModelsConfig`], [`PacingConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EnrichmentProfilesConfig, ModelsConfig, OpenRouterConfig, PacingConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{LessonpathError, Result};
pub use types::{
    DEFAULT_DOMAIN, LABEL_SEPARATOR, LearningPathway, ModelProfile, ProficiencyLevel, RunId,
    VideoRecord, naive_topic, normalize_label,
};
