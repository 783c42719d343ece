//! Collaborator traits and the public client trait.
//!
//! The report reads everything through four narrow interfaces so each can be
//! backed by a different store and mocked on its own:
//!
//! - [`EnrolmentSource`]: courses, users, enrolments, roles
//! - [`CapabilityChecker`]: capability and role-assignment checks
//! - [`GroupIndex`]: groups and memberships
//! - [`ForumStore`]: forums, discussions, post counts
//!
//! Collaborators report data-access failures as [`DirectoryError`];
//! authorization outcomes are plain `bool`s.

use std::collections::BTreeSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::context::{ContextRef, ViewerContext};
use crate::errors::{DirectoryError, StudentActivityError};
use crate::models::{
    Course, Forum, Group, Participant, Role, RoleAssignment, RosterQuery, UserEnrolment,
    UserRecord,
};
use crate::report::{PostCountRequest, ReportRequest, StudentActivityReport};
use crate::scope::PostCountQuery;

/// Courses, users and enrolments.
#[async_trait]
pub trait EnrolmentSource: Send + Sync {
    async fn course(&self, course_id: Uuid) -> Result<Option<Course>, DirectoryError>;

    async fn user(&self, user_id: Uuid) -> Result<Option<UserRecord>, DirectoryError>;

    /// Whether the viewer may enter the course at all: an active enrolment
    /// or viewing rights.
    async fn can_access_course(
        &self,
        viewer: &ViewerContext,
        course_id: Uuid,
    ) -> Result<bool, DirectoryError>;

    /// Whether `user_id` holds any enrolment in the course, suspended or
    /// disabled ones included.
    async fn is_enrolled(&self, course_id: Uuid, user_id: Uuid) -> Result<bool, DirectoryError>;

    /// Whether `user_id` may view the course without being enrolled
    /// (e.g. a teacher assigned at category level).
    async fn is_viewing(&self, course_id: Uuid, user_id: Uuid) -> Result<bool, DirectoryError>;

    /// One sorted page of enrolled users, optionally limited to a group.
    async fn enrolled_users(&self, query: &RosterQuery)
    -> Result<Vec<Participant>, DirectoryError>;

    /// Total enrolled users, optionally limited to a group.
    async fn count_enrolled_users(
        &self,
        course_id: Uuid,
        group_id: Option<Uuid>,
    ) -> Result<u64, DirectoryError>;

    /// Every role that can appear in the course.
    async fn all_roles(&self, course_id: Uuid) -> Result<Vec<Role>, DirectoryError>;

    /// Role ids the viewer may assign and unassign in the course. Empty
    /// unless the viewer holds the role-assign capability there.
    async fn assignable_roles(
        &self,
        viewer: &ViewerContext,
        course_id: Uuid,
    ) -> Result<BTreeSet<Uuid>, DirectoryError>;

    async fn user_roles(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, DirectoryError>;

    async fn user_enrolments(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<UserEnrolment>, DirectoryError>;
}

/// Capability evaluation.
#[async_trait]
pub trait CapabilityChecker: Send + Sync {
    /// Whether `user_id` holds `capability` in `context`.
    async fn has_capability(
        &self,
        capability: &str,
        context: ContextRef,
        user_id: Uuid,
    ) -> Result<bool, DirectoryError>;

    /// Whether the viewer holds any role assignment in the target's user
    /// context (parent, mentor and similar delegated relationships).
    async fn has_user_context_assignment(
        &self,
        viewer_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, DirectoryError>;
}

/// Groups and memberships.
#[async_trait]
pub trait GroupIndex: Send + Sync {
    async fn course_groups(&self, course_id: Uuid) -> Result<Vec<Group>, DirectoryError>;

    /// Groups of the course `user_id` belongs to, limited to `grouping`
    /// when given.
    async fn user_groups(
        &self,
        course_id: Uuid,
        user_id: Uuid,
        grouping: Option<Uuid>,
    ) -> Result<Vec<Group>, DirectoryError>;

    async fn group(&self, group_id: Uuid) -> Result<Option<Group>, DirectoryError>;
}

/// Forums, discussions and posts.
#[async_trait]
pub trait ForumStore: Send + Sync {
    async fn forum(&self, forum_id: Uuid) -> Result<Option<Forum>, DirectoryError>;

    async fn course_forums(&self, course_id: Uuid) -> Result<Vec<Forum>, DirectoryError>;

    /// Forums in `courses` where `user_id` has posted (started a discussion,
    /// when `discussions_only`), optionally limited to one forum.
    async fn forums_posted_in(
        &self,
        user_id: Uuid,
        courses: &[Uuid],
        discussions_only: bool,
        forum_filter: Option<Uuid>,
    ) -> Result<BTreeSet<Uuid>, DirectoryError>;

    /// Discussions of `forum_id` that contain a post by `user_id`.
    async fn discussions_user_posted_in(
        &self,
        forum_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, DirectoryError>;

    /// Number of posts matching the query.
    async fn count_posts(&self, query: &PostCountQuery) -> Result<u64, DirectoryError>;
}

/// Public API of the `student_activity` module.
///
/// ```ignore
/// let client: Arc<dyn StudentActivityClientV1> = module.client();
/// let report = client.build_report(&viewer, ReportRequest::for_course(course_id, now)).await?;
/// ```
#[async_trait]
pub trait StudentActivityClientV1: Send + Sync {
    /// Count the posts of one user that the viewer is allowed to see.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied`, `NotEnrolled`, `GroupMismatch`, `LoginRequired`
    ///   only when `require_access` is set
    /// - `NotFound` if the course or forum does not exist
    /// - `Unavailable` / `Internal` on collaborator failures
    async fn count_posts(
        &self,
        viewer: &ViewerContext,
        request: PostCountRequest,
    ) -> Result<u64, StudentActivityError>;

    /// Assemble one page of the student activity report.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` if the viewer may not run the report
    /// - `NotFound` if the course, group or forum does not exist in the course
    /// - `Validation` for the site course
    /// - `Unavailable` / `Internal` on collaborator failures
    async fn build_report(
        &self,
        viewer: &ViewerContext,
        request: ReportRequest,
    ) -> Result<StudentActivityReport, StudentActivityError>;
}
