//! Uniform error taxonomy. One error type for the whole core — no
//! per-module error enum lives alongside it, per the single-package rule.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a failure. Drives HTTP status mapping and
/// retry eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    Forbidden,
    Internal,
    Timeout,
    Connection,
    RateLimit,
    External,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct VaultError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    pub severity: Severity,
    pub retryable: bool,
    pub retry_after: Option<Duration>,
    pub resource: Option<String>,
    pub operation: Option<String>,
    pub user_id: Option<String>,
    pub request_id: Option<String>,
}

pub type Result<T> = std::result::Result<T, VaultError>;

impl VaultError {
    pub fn new(kind: ErrorKind, code: &'static str, message: impl Into<String>) -> Self {
        let (severity, retryable) = default_severity_and_retry(kind);
        VaultError {
            kind,
            code,
            message: message.into(),
            cause: None,
            severity,
            retryable,
            retry_after: None,
            resource: None,
            operation: None,
            user_id: None,
            request_id: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, "VALIDATION_ERROR", message)
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self::new(ErrorKind::NotFound, "NOT_FOUND", format!("{resource} not found"))
            .with_resource(resource)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, "CONFLICT", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, "FORBIDDEN", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, "INTERNAL_ERROR", message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, "TIMEOUT", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, "UNAVAILABLE", message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Duration) -> Self {
        Self::new(ErrorKind::RateLimit, "RATE_LIMITED", message).with_retry_after(retry_after)
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retryable = true;
        self.retry_after = Some(retry_after);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// HTTP status code for this error's kind, per the taxonomy's mapping table.
    pub fn http_status(&self) -> u16 {
        match self.kind {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::RateLimit => 429,
            ErrorKind::Internal => 500,
            ErrorKind::External => 502,
            ErrorKind::Unavailable => 503,
            ErrorKind::Timeout => 504,
            ErrorKind::Connection => 503,
        }
    }
}

fn default_severity_and_retry(kind: ErrorKind) -> (Severity, bool) {
    match kind {
        ErrorKind::Validation
        | ErrorKind::NotFound
        | ErrorKind::Unauthorized
        | ErrorKind::Forbidden => (Severity::Info, false),
        ErrorKind::Conflict => (Severity::Warning, false),
        ErrorKind::RateLimit | ErrorKind::Timeout | ErrorKind::Connection | ErrorKind::Unavailable => {
            (Severity::Warning, true)
        }
        ErrorKind::External => (Severity::Error, true),
        ErrorKind::Internal => (Severity::Critical, false),
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<redb::Error> for VaultError {
    fn from(err: redb::Error) -> Self {
        VaultError::internal(format!("storage engine error: {err}")).with_cause(err)
    }
}

impl From<redb::TransactionError> for VaultError {
    fn from(err: redb::TransactionError) -> Self {
        VaultError::internal(format!("storage transaction error: {err}")).with_cause(err)
    }
}

impl From<redb::DatabaseError> for VaultError {
    fn from(err: redb::DatabaseError) -> Self {
        VaultError::unavailable(format!("storage open error: {err}")).with_cause(err)
    }
}

impl From<redb::TableError> for VaultError {
    fn from(err: redb::TableError) -> Self {
        VaultError::internal(format!("storage table error: {err}")).with_cause(err)
    }
}

impl From<redb::StorageError> for VaultError {
    fn from(err: redb::StorageError) -> Self {
        VaultError::unavailable(format!("storage I/O error: {err}")).with_cause(err)
    }
}

impl From<redb::CommitError> for VaultError {
    fn from(err: redb::CommitError) -> Self {
        VaultError::internal(format!("storage commit error: {err}")).with_cause(err)
    }
}

impl From<bincode::Error> for VaultError {
    fn from(err: bincode::Error) -> Self {
        VaultError::internal(format!("codec error: {err}")).with_cause(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(VaultError::validation("x").http_status(), 400);
        assert_eq!(VaultError::not_found("node").http_status(), 404);
        assert_eq!(VaultError::conflict("x").http_status(), 409);
        assert_eq!(VaultError::internal("x").http_status(), 500);
    }

    #[test]
    fn not_found_carries_resource() {
        let err = VaultError::not_found("node:abc");
        assert_eq!(err.resource.as_deref(), Some("node:abc"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn rate_limited_is_retryable_with_delay() {
        let err = VaultError::rate_limited("slow down", Duration::from_secs(2));
        assert!(err.is_retryable());
        assert_eq!(err.retry_after, Some(Duration::from_secs(2)));
    }
}
