//! Shared error-kind vocabulary. Every bounded-context error enum in
//! [`crate::payroll`] maps each of its variants onto exactly one of these
//! kinds via [`HasErrorKind::kind`], so callers at the HTTP-shell boundary
//! (a non-goal here, but the seam matters) can translate uniformly to status
//! codes without matching on every concrete error type.

/// One row of the error-kind table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidState,
    PermissionDenied,
    ValidationFailed,
    AmbiguousRate,
    Internal,
}

pub trait HasErrorKind {
    fn kind(&self) -> ErrorKind;
}

/// Wraps [`validator::ValidationErrors`] so schema-level violations travel
/// through the same `HasErrorKind` seam as every other bounded-context error.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ValidationFailed(#[from] pub validator::ValidationErrors);

impl HasErrorKind for ValidationFailed {
    fn kind(&self) -> ErrorKind {
        ErrorKind::ValidationFailed
    }
}
