//! Catalog error taxonomy

use thiserror::Error;

use super::db::DbErrorKind;

/// Errors raised by catalog persistence and menu mutations
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Caller-supplied data failed a precondition; never retried
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Uniqueness violation
    #[error("{field} '{value}' already exists")]
    Conflict {
        /// Name of the unique field
        field: String,
        /// Conflicting value, when known
        value: String,
    },

    /// Entity or relation row not found
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Entity id
        id: i32,
    },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl CatalogError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn slug_conflict(slug: impl Into<String>) -> Self {
        Self::Conflict {
            field: "Slug".to_string(),
            value: slug.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound { entity, id }
    }

    /// Map a database error, turning unique-constraint violations into
    /// [`CatalogError::Conflict`] on `field`.
    pub fn from_db(field: &str, value: &str, err: sea_orm::DbErr) -> Self {
        match DbErrorKind::from_db_err(&err) {
            DbErrorKind::UniqueViolation => Self::Conflict {
                field: field.to_string(),
                value: value.to_string(),
            },
            _ => Self::Database(err),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is caused by caller input rather than the store
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Conflict { .. } | Self::NotFound { .. } => true,
            Self::Database(err) => DbErrorKind::from_db_err(err).is_client_error(),
        }
    }
}
