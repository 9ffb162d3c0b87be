//! Shared types, errors, and configuration for Dossier.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error taxonomy with HTTP mappings
//! - Configuration management
//! - Caller identity claims and bearer-token verification

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;


pub use auth::{Claims, Identity};
pub use config::{
    AppConfig, AuthConfig, ConverterCommand, ConverterConfig, DatabaseConfig, ServerConfig,
    StorageSettings, UploadConfig,
};
pub use error::AppError;
pub use jwt::{JwtError, JwtService, extract_bearer_token};
