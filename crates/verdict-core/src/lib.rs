//! Core types, configuration, and error handling for Verdict.
//!
//! This crate provides the shared foundation used by the review pipeline and
//! the `verdict` binary:
//! - [`VerdictError`]: unified error type using `thiserror`
//! - [`VerdictConfig`]: configuration loaded from `.verdict.toml` and the environment
//! - Shared types: [`RepoId`], [`PullRequest`], [`ChangedFile`], [`SessionIdentity`]

mod config;
mod error;
mod types;

pub use config::{AgentConfig, GitHubConfig, VerdictConfig, CONFIG_FILE_NAME};
pub use error::VerdictError;
pub use types::{ChangedFile, PullRequest, RepoId, SessionIdentity};

/// A convenience `Result` type for Verdict operations.
pub type Result<T> = std::result::Result<T, VerdictError>;
