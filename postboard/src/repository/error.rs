//! Repository error types
//!
//! Every repository failure carries the operation that was running, a
//! [`RepositoryErrorKind`] and, where known, the entity involved. Callers that
//! only care about the broad outcome use [`RepositoryError::category`].
//!
//! # Example
//!
//! ```rust
//! use postboard::repository::{ErrorCategory, RepositoryError, RepositoryOperation};
//!
//! let error = RepositoryError::not_found(RepositoryOperation::FindOne, "Account", "0191e2");
//! assert_eq!(error.category(), ErrorCategory::NotFound);
//! assert!(!error.is_retriable());
//! ```

use std::fmt;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Persisting a new entity
    Create,
    /// Loading the first entity matching a query
    FindOne,
    /// Loading every entity matching a query
    FindMany,
    /// Loading one page of entities matching a query
    FindManyPaginated,
    /// Writing an existing entity back
    Update,
    /// Removing an entity
    Delete,
    /// Counting entities matching a query
    Count,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::FindOne => write!(f, "find_one"),
            Self::FindMany => write!(f, "find_many"),
            Self::FindManyPaginated => write!(f, "find_many_paginated"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Count => write!(f, "count"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// No row matched
    NotFound,
    /// Uniqueness or version conflict
    Conflict,
    /// Foreign key or check constraint violation
    ConstraintViolation,
    /// Query could not be compiled (placeholder mismatch, bad ordering field)
    InvalidQuery,
    /// Failed to reach the database
    ConnectionFailed,
    /// Operation timed out waiting for the pool
    Timeout,
    /// Underlying database error
    DatabaseError,
    /// The caller's context was cancelled or its deadline passed
    Cancelled,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::InvalidQuery => write!(f, "invalid_query"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Coarse classification handed to the service layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Nothing matched
    NotFound,
    /// Duplicate key or stale version
    Conflict,
    /// Any other storage failure
    Persistence,
    /// Caller gave up
    Cancelled,
}

/// Structured repository error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Account", "Post")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(
        operation: RepositoryOperation,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::NotFound, "Entity not found")
            .with_entity(entity_type, entity_id)
    }

    /// Create a "not found" error for a query that matched nothing
    pub fn no_match(operation: RepositoryOperation, entity_type: impl Into<String>) -> Self {
        let mut error = Self::new(
            operation,
            RepositoryErrorKind::NotFound,
            "No entity matched the query",
        );
        error.entity_type = Some(entity_type.into());
        error
    }

    /// Create a conflict error
    pub fn conflict(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Conflict, message)
    }

    /// Create an invalid query error
    pub fn invalid_query(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::InvalidQuery, message)
    }

    /// Create a cancellation error
    pub fn cancelled(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Cancelled, message)
    }

    /// Create a database error
    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    /// Classify a driver error raised while running `operation`
    pub fn from_sqlx(operation: RepositoryOperation, err: sqlx::Error) -> Self {
        use sqlx::Error as E;
        match err {
            E::RowNotFound => Self::new(operation, RepositoryErrorKind::NotFound, "Row not found"),
            E::PoolTimedOut => Self::new(
                operation,
                RepositoryErrorKind::Timeout,
                "Connection pool timed out",
            ),
            E::PoolClosed => Self::new(
                operation,
                RepositoryErrorKind::ConnectionFailed,
                "Connection pool is closed",
            ),
            E::Io(e) => Self::new(
                operation,
                RepositoryErrorKind::ConnectionFailed,
                e.to_string(),
            ),
            E::WorkerCrashed => Self::new(
                operation,
                RepositoryErrorKind::ConnectionFailed,
                "Database worker crashed",
            ),
            E::Database(db_err) => {
                let kind = if db_err.is_unique_violation() {
                    RepositoryErrorKind::Conflict
                } else if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                    RepositoryErrorKind::ConstraintViolation
                } else {
                    RepositoryErrorKind::DatabaseError
                };
                Self::new(operation, kind, db_err.to_string())
            }
            other => Self::new(
                operation,
                RepositoryErrorKind::DatabaseError,
                other.to_string(),
            ),
        }
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Fold the kind into the category the service layer branches on
    pub fn category(&self) -> ErrorCategory {
        match self.kind {
            RepositoryErrorKind::NotFound => ErrorCategory::NotFound,
            RepositoryErrorKind::Conflict => ErrorCategory::Conflict,
            RepositoryErrorKind::Cancelled => ErrorCategory::Cancelled,
            RepositoryErrorKind::ConstraintViolation
            | RepositoryErrorKind::InvalidQuery
            | RepositoryErrorKind::ConnectionFailed
            | RepositoryErrorKind::Timeout
            | RepositoryErrorKind::DatabaseError => ErrorCategory::Persistence,
        }
    }

    /// Shorthand for `category() == ErrorCategory::NotFound`
    pub fn is_not_found(&self) -> bool {
        self.kind == RepositoryErrorKind::NotFound
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout
        )
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id) {
            (Some(entity_type), Some(entity_id)) => write!(f, " [{}: {}]", entity_type, entity_id)?,
            (Some(entity_type), None) => write!(f, " [{}]", entity_type)?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_operation_display() {
        assert_eq!(format!("{}", RepositoryOperation::FindOne), "find_one");
        assert_eq!(
            format!("{}", RepositoryOperation::FindManyPaginated),
            "find_many_paginated"
        );
        assert_eq!(format!("{}", RepositoryOperation::Count), "count");
    }

    #[test]
    fn test_category_folds_storage_failures_into_persistence() {
        for kind in [
            RepositoryErrorKind::ConstraintViolation,
            RepositoryErrorKind::InvalidQuery,
            RepositoryErrorKind::ConnectionFailed,
            RepositoryErrorKind::Timeout,
            RepositoryErrorKind::DatabaseError,
        ] {
            let error = RepositoryError::new(RepositoryOperation::FindMany, kind, "boom");
            assert_eq!(error.category(), ErrorCategory::Persistence);
        }
    }

    #[test]
    fn test_not_found_is_distinct_from_persistence() {
        let error = RepositoryError::no_match(RepositoryOperation::FindOne, "Account");
        assert_eq!(error.category(), ErrorCategory::NotFound);
        assert!(error.is_not_found());
        assert_eq!(error.entity_type.as_deref(), Some("Account"));
        assert!(error.entity_id.is_none());
    }

    #[test]
    fn test_cancelled_category() {
        let error = RepositoryError::cancelled(RepositoryOperation::Count, "deadline exceeded");
        assert_eq!(error.category(), ErrorCategory::Cancelled);
        assert!(!error.is_retriable());
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let error = RepositoryError::from_sqlx(RepositoryOperation::FindOne, sqlx::Error::RowNotFound);
        assert_eq!(error.kind, RepositoryErrorKind::NotFound);
        assert_eq!(error.operation, RepositoryOperation::FindOne);
    }

    #[test]
    fn test_from_sqlx_pool_timeout_is_retriable() {
        let error = RepositoryError::from_sqlx(RepositoryOperation::Create, sqlx::Error::PoolTimedOut);
        assert_eq!(error.kind, RepositoryErrorKind::Timeout);
        assert!(error.is_retriable());
    }

    #[test]
    fn test_with_operation_and_entity() {
        let error = RepositoryError::conflict(RepositoryOperation::Create, "stale version")
            .with_operation(RepositoryOperation::Update)
            .with_entity("Post", "p1");
        assert_eq!(error.operation, RepositoryOperation::Update);
        assert_eq!(error.entity_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_display_with_entity() {
        let error = RepositoryError::not_found(RepositoryOperation::Delete, "Post", "p1");
        let display = format!("{}", error);
        assert!(display.contains("not_found"));
        assert!(display.contains("delete"));
        assert!(display.contains("[Post: p1]"));
    }

    #[test]
    fn test_display_without_entity() {
        let error = RepositoryError::database_error(RepositoryOperation::Count, "syntax error");
        let display = format!("{}", error);
        assert!(display.contains("database_error"));
        assert!(!display.contains('['));
    }
}
