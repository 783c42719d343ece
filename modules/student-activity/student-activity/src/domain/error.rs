use student_activity_sdk::{DirectoryError, StudentActivityError};
use thiserror::Error;
use uuid::Uuid;

/// Domain-specific errors using thiserror
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Access denied")]
    PermissionDenied,

    #[error("User {user_id} is not enrolled in course {course_id}")]
    NotEnrolled { course_id: Uuid, user_id: Uuid },

    #[error("Viewer shares no group with the user in course {course_id}")]
    GroupMismatch { course_id: Uuid },

    #[error("Login required")]
    LoginRequired,

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Directory unavailable: {message}")]
    DirectoryUnavailable { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    #[must_use]
    pub fn not_enrolled(course_id: Uuid, user_id: Uuid) -> Self {
        Self::NotEnrolled { course_id, user_id }
    }

    #[must_use]
    pub fn group_mismatch(course_id: Uuid) -> Self {
        Self::GroupMismatch { course_id }
    }

    #[must_use]
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// An access decision rather than a failure.
    #[must_use]
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied
                | Self::NotEnrolled { .. }
                | Self::GroupMismatch { .. }
                | Self::LoginRequired
        )
    }
}

impl From<DirectoryError> for DomainError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::NotFound { entity, id } => Self::NotFound { entity, id },
            DirectoryError::Unavailable(message) => Self::DirectoryUnavailable { message },
            DirectoryError::Internal(message) => Self::Internal(message),
        }
    }
}

/// Convert domain errors to SDK errors for public API consumption.
impl From<DomainError> for StudentActivityError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::PermissionDenied => Self::permission_denied(),
            DomainError::NotEnrolled { course_id, user_id } => {
                Self::not_enrolled(course_id, user_id)
            }
            DomainError::GroupMismatch { course_id } => Self::group_mismatch(course_id),
            DomainError::LoginRequired => Self::LoginRequired,
            DomainError::NotFound { id, .. } => Self::not_found(id),
            DomainError::Validation { field, message } => {
                Self::validation(format!("{field}: {message}"))
            }
            DomainError::DirectoryUnavailable { .. } => Self::Unavailable,
            DomainError::Internal(_) => Self::internal(),
        }
    }
}
