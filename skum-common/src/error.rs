//! Common error types for SKU Manager

use thiserror::Error;

/// Common result type for SKU Manager operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across SKU Manager tools
///
/// Value coercion has no error type of its own; these cover the
/// bootstrap concerns around it.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
