//! Shared utilities, configuration, and error handling for Easel
//!
//! This crate provides common functionality used across the Easel application:
//! - Configuration management following 12-factor principles
//! - Error types and handling
//! - Request extractors for validated JSON and multipart uploads

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;

pub use db::{RepositoryError, RepositoryResult};
pub use error::{Error, FieldErrors, Result};
pub use extractors::{MultipartForm, ResourcePath, UploadedFile, ValidatedJson};
