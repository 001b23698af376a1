//! Error types for menuforge-core
//!
//! - **CatalogError**: failures surfaced by the relation store and the
//!   mutation handlers (validation, conflicts, missing rows, database).
//! - **DbErrorKind**: classification of raw `sea_orm::DbErr` values so that
//!   constraint violations can be reported as conflicts.
//!
//! A row key that no longer resolves is not an error anywhere in this crate;
//! handlers skip it. Partially failed batches are reported through
//! [`crate::menu::BatchReport`] instead of an error value.
//!
//! # Examples
//!
//! ```rust
//! use menuforge::errors::CatalogError;
//!
//! let err = CatalogError::slug_conflict("espresso");
//! assert!(err.is_conflict());
//! assert_eq!(err.to_string(), "Slug 'espresso' already exists");
//! ```

pub mod catalog;
pub mod db;

pub use catalog::CatalogError;
pub use db::{format_db_error, DbErrorKind};

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
