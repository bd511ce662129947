//! Shared configuration and domain vocabulary for the WhatsApp export dashboard.

pub mod app_config;
pub mod config;
pub mod posts;
pub mod roles;
pub mod sentiment;
pub mod uploads;

pub use app_config::{AppConfig, Environment, SmtpConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use posts::{MediaKind, PostStatus};
pub use roles::Role;
pub use sentiment::{Sentiment, SentimentCounts, SentimentFilter};
pub use uploads::FolderType;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("invalid post status: {0}")]
    InvalidPostStatus(String),
    #[error("invalid media kind: {0}")]
    InvalidMediaKind(String),
    #[error("invalid folder type: {0}")]
    InvalidFolderType(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
