//! Backing store access
//!
//! The dedup stages only see the [`DuplicateStore`] trait. [`SqliteStore`]
//! is the production implementation over a single SQLite connection.

use async_trait::async_trait;
use skum_common::Scalar;
use std::path::PathBuf;
use thiserror::Error;

mod sqlite;

pub use sqlite::{SqliteStore, TableSpec};

/// One candidate row before coercion
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub business_key: Scalar,
    pub payload: Scalar,
}

impl RawRow {
    pub fn new(business_key: impl Into<Scalar>, payload: impl Into<Scalar>) -> Self {
        Self {
            business_key: business_key.into(),
            payload: payload.into(),
        }
    }
}

/// Store failures; never defaulted, always propagated
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database file does not exist
    #[error("Database not found: {0}")]
    MissingDatabase(PathBuf),

    /// Opening the connection failed
    #[error("Failed to open database {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    /// Reading duplicate candidates failed
    #[error("Duplicate candidate query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Writing a payload failed (connectivity, constraint violation, ...)
    #[error("Update for key '{key}' failed: {source}")]
    Write {
        key: String,
        #[source]
        source: sqlx::Error,
    },

    /// Table or column name cannot be used as an identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Any other database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Operations the dedup pipeline needs from a store
#[async_trait]
pub trait DuplicateStore: Send {
    /// All rows whose business key occurs more than once, in store order
    async fn query_duplicate_candidates(&mut self) -> Result<Vec<RawRow>, StoreError>;

    /// Overwrite the payload of every row whose key equals `key` exactly
    ///
    /// Returns the number of rows affected.
    async fn update_payload_for_key(&mut self, key: &str, payload: &str)
        -> Result<u64, StoreError>;
}
