//! Public error types for the `student_activity` module.
//!
//! These errors are safe to expose to other modules and consumers.

use thiserror::Error;
use uuid::Uuid;

/// Errors returned by collaborator services (enrolment, capability, group
/// and forum stores).
///
/// These represent data-access failures only. Authorization outcomes are
/// expressed as `bool` results, never as errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// A required record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// The backing store cannot be reached.
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// Any other failure.
    #[error("directory internal error: {0}")]
    Internal(String),
}

impl DirectoryError {
    #[must_use]
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

/// Errors returned by the `StudentActivityClientV1`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StudentActivityError {
    /// The viewer may not run the report or access a required course.
    #[error("Access denied")]
    PermissionDenied,

    /// The target user is not enrolled in a required course.
    #[error("User {user_id} is not enrolled in course {course_id}")]
    NotEnrolled { course_id: Uuid, user_id: Uuid },

    /// Viewer and target share no group in a separate-groups course.
    #[error("Not a member of any group shared with the user in course {course_id}")]
    GroupMismatch { course_id: Uuid },

    /// The request needs an authenticated, non-guest viewer.
    #[error("Login required")]
    LoginRequired,

    /// Resource with the specified ID was not found.
    #[error("Resource not found: {id}")]
    NotFound { id: Uuid },

    /// The request is malformed.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A collaborator service is unavailable.
    #[error("Service unavailable")]
    Unavailable,

    /// An internal error occurred.
    #[error("Internal error")]
    Internal,
}

impl StudentActivityError {
    #[must_use]
    pub fn permission_denied() -> Self {
        Self::PermissionDenied
    }

    #[must_use]
    pub fn not_enrolled(course_id: Uuid, user_id: Uuid) -> Self {
        Self::NotEnrolled { course_id, user_id }
    }

    #[must_use]
    pub fn group_mismatch(course_id: Uuid) -> Self {
        Self::GroupMismatch { course_id }
    }

    #[must_use]
    pub fn not_found(id: Uuid) -> Self {
        Self::NotFound { id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::Internal
    }

    /// Authorization facts; retrying will not change the outcome.
    #[must_use]
    pub fn is_authorization_failure(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied
                | Self::NotEnrolled { .. }
                | Self::GroupMismatch { .. }
                | Self::LoginRequired
        )
    }
}
