#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Student Activity SDK
//!
//! This crate provides the public API for the `student_activity` module:
//!
//! - [`StudentActivityClientV1`] - Public API trait for consumers
//! - [`EnrolmentSource`], [`CapabilityChecker`], [`GroupIndex`], [`ForumStore`] -
//!   Collaborator traits the module reads through
//! - [`ViewerContext`], [`ContextRef`] - Acting user and capability scopes
//! - [`PostScope`], [`PostFilter`], [`ForumConstraint`] - Composed post predicates
//! - [`ReportRequest`], [`StudentActivityReport`] - Report models
//! - [`StudentActivityError`], [`DirectoryError`] - Error types
//!
//! ## Usage
//!
//! ```ignore
//! use student_activity_sdk::{ReportRequest, StudentActivityClientV1, ViewerContext};
//!
//! let viewer = ViewerContext::user(teacher_id);
//! let report = client
//!     .build_report(&viewer, ReportRequest::for_course(course_id, now))
//!     .await?;
//! for row in &report.rows {
//!     println!("{}: {} posts", row.full_name, row.post_count);
//! }
//! ```

pub mod api;
pub mod capabilities;
pub mod context;
pub mod errors;
pub mod models;
pub mod report;
pub mod scope;

// Re-export main types at crate root
pub use api::{CapabilityChecker, EnrolmentSource, ForumStore, GroupIndex, StudentActivityClientV1};
pub use context::{ContextRef, ViewerContext, ViewerContextBuilder};
pub use errors::{DirectoryError, StudentActivityError};
pub use models::{
    Course, Discussion, EnrolmentInstance, Forum, ForumKind, Group, GroupMode, Participant, Post,
    Role, RoleAssignment, RosterQuery, SortDirection, SortField, UserEnrolment, UserRecord,
};
pub use report::{
    EnrolmentBadge, EnrolmentPeriod, GroupBadge, HideableField, MenuEntry, Paging,
    ParticipantRow, PostCountRequest, ReportColumn, ReportHeading, ReportRequest, RoleBadge,
    RowLinks, StudentActivityReport, ViewerPermissions,
};
pub use scope::{ForumConstraint, PostCountQuery, PostFilter, PostScope};
