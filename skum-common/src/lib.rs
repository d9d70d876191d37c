//! # SKU Manager Common Library
//!
//! Shared code for the SKU Manager tools including:
//! - Null-tolerant value coercion (`coerce`)
//! - The opaque store value handed to coercion (`Scalar`)
//! - Bootstrap configuration loading
//! - Common error types

pub mod coerce;
pub mod config;
pub mod error;
pub mod scalar;

pub use error::{Error, Result};
pub use scalar::Scalar;
