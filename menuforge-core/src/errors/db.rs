//! Database error categorization
//!
//! Buckets `sea_orm::DbErr` values by cause so the store can tell a slug
//! collision from a lost connection.

use sea_orm::{DbErr, SqlErr};

/// Categories of database errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Query returned no results
    NotFound,
    /// Unique constraint violation
    UniqueViolation,
    /// Foreign key constraint violation
    ForeignKeyViolation,
    /// Connection could not be established or was lost
    ConnectionError,
    /// Query or pool acquire timed out
    Timeout,
    /// Anything else
    Unknown,
}

impl DbErrorKind {
    /// Categorize a sea_orm database error
    ///
    /// ```
    /// use menuforge::errors::DbErrorKind;
    /// use sea_orm::{DbErr, RuntimeErr};
    ///
    /// let err = DbErr::Exec(RuntimeErr::Internal(
    ///     "UNIQUE constraint failed: products.slug".to_string(),
    /// ));
    /// assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::UniqueViolation);
    /// ```
    pub fn from_db_err(err: &DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => return Self::UniqueViolation,
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => return Self::ForeignKeyViolation,
            _ => {}
        }

        match err {
            DbErr::RecordNotFound(_) => Self::NotFound,
            DbErr::ConnectionAcquire(_) => Self::Timeout,
            DbErr::Conn(msg) if msg.to_string().to_lowercase().contains("timeout") => {
                Self::Timeout
            }
            DbErr::Conn(_) => Self::ConnectionError,
            other => Self::from_message(&other.to_string()),
        }
    }

    fn from_message(msg: &str) -> Self {
        let msg_lower = msg.to_lowercase();
        if msg_lower.contains("unique") || msg_lower.contains("duplicate") {
            Self::UniqueViolation
        } else if msg_lower.contains("foreign key") {
            Self::ForeignKeyViolation
        } else if msg_lower.contains("timeout") || msg_lower.contains("timed out") {
            Self::Timeout
        } else {
            Self::Unknown
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::UniqueViolation | Self::ForeignKeyViolation
        )
    }
}

/// Format a database error with the operation that failed
pub fn format_db_error(operation: &str, err: &DbErr) -> (DbErrorKind, String) {
    let kind = DbErrorKind::from_db_err(err);

    let message = match kind {
        DbErrorKind::NotFound => format!("{}: record not found", operation),
        DbErrorKind::UniqueViolation => format!("{}: duplicate key violation", operation),
        DbErrorKind::ForeignKeyViolation => {
            format!("{}: foreign key constraint violation", operation)
        }
        DbErrorKind::ConnectionError => format!("{}: database connection failed", operation),
        DbErrorKind::Timeout => format!("{}: query timeout", operation),
        DbErrorKind::Unknown => format!("{}: database error - {}", operation, err),
    };

    (kind, message)
}
