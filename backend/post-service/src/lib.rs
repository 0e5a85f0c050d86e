/// Post Service Library
///
/// Handles posts, comments, likes, and the post feeds for the social platform.
///
/// # Modules
///
/// - `handlers`: Post-related HTTP request handlers
/// - `models`: Data structures for posts, blocks, comments, notifications
/// - `services`: Business logic layer
/// - `db`: Database access layer and repositories
/// - `storage`: Image store client (S3-compatible object storage)
/// - `middleware`: HTTP middleware for authentication and request metrics
/// - `auth`: JWT validation helpers
/// - `error`: Error types and handling
/// - `config`: Configuration management
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
