use std::collections::BTreeSet;

use student_activity_sdk::capabilities as caps;
use student_activity_sdk::{
    ContextRef, Course, Forum, ForumConstraint, ForumKind, GroupMode, PostFilter, PostScope,
    ViewerContext,
};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{Directory, ServiceConfig};
use crate::domain::error::DomainError;

/// Input of one access evaluation.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    /// The user whose posts are being counted.
    pub target_id: Uuid,
    /// Candidate courses.
    pub courses: Vec<Uuid>,
    /// Fail on the first inaccessible course instead of skipping it.
    pub require_access: bool,
    pub forum_filter: Option<Uuid>,
    pub discussions_only: bool,
    pub at: OffsetDateTime,
}

/// Courses and forum scope the viewer may count the target's posts in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermittedForums {
    pub courses: Vec<Uuid>,
    pub scope: PostScope,
}

impl PermittedForums {
    /// Nothing to count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scope.is_deny_all()
    }
}

/// Why a course was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Denial {
    PermissionDenied,
    NotEnrolled,
    LoginRequired,
    GroupMismatch,
}

impl Denial {
    fn into_error(self, course_id: Uuid, target_id: Uuid) -> DomainError {
        match self {
            Self::PermissionDenied => DomainError::PermissionDenied,
            Self::NotEnrolled => DomainError::not_enrolled(course_id, target_id),
            Self::LoginRequired => DomainError::LoginRequired,
            Self::GroupMismatch => DomainError::group_mismatch(course_id),
        }
    }
}

/// Decides which forums a viewer may count another user's posts in.
///
/// Evaluation runs in two phases:
///
/// 1. **Courses.** Each candidate course is checked for viewer access,
///    target enrolment and (under enforced separate groups) a shared group.
///    Rejected courses fail the request when `require_access` is set and
///    are skipped otherwise.
/// 2. **Forums.** Within the surviving courses, every forum the target
///    posted in is either fully visible or restricted by a conjunction of
///    [`PostFilter`]s. Forums the viewer cannot read are left out.
///
/// The target themself, and viewers holding a role in the target's user
/// context with the view-details and read-posts capabilities there
/// (parents, mentors), skip the viewer checks and see every forum in full.
pub struct AccessPolicy {
    directory: Directory,
    config: ServiceConfig,
}

impl AccessPolicy {
    #[must_use]
    pub fn new(directory: Directory, config: ServiceConfig) -> Self {
        Self { directory, config }
    }

    /// Evaluate which courses and forums are permitted.
    ///
    /// # Errors
    ///
    /// - `NotFound` when a candidate course does not exist
    /// - `PermissionDenied`, `NotEnrolled`, `LoginRequired`, `GroupMismatch`
    ///   when `require_access` is set and a course is rejected, and
    ///   `PermissionDenied` when no course survives
    /// - directory failures
    #[instrument(skip(self, viewer, request), fields(target_id = %request.target_id, courses = request.courses.len()))]
    pub async fn evaluate(
        &self,
        viewer: &ViewerContext,
        request: &AccessRequest,
    ) -> Result<PermittedForums, DomainError> {
        let target_id = request.target_id;
        let self_or_delegate = self.is_self_or_delegate(viewer, target_id).await?;

        let mut permitted = Vec::with_capacity(request.courses.len());
        for &course_id in &request.courses {
            let course = self
                .directory
                .enrolments
                .course(course_id)
                .await?
                .ok_or_else(|| DomainError::not_found("course", course_id))?;

            let denial = if self_or_delegate {
                self.check_target_access(&course, target_id).await?
            } else {
                self.check_viewer_access(viewer, &course, target_id).await?
            };

            match denial {
                None => permitted.push(course),
                Some(denial) if request.require_access => {
                    return Err(denial.into_error(course_id, target_id));
                }
                Some(denial) => debug!(%course_id, ?denial, "course skipped"),
            }
        }

        if permitted.is_empty() {
            if request.require_access {
                return Err(DomainError::PermissionDenied);
            }
            return Ok(PermittedForums::default());
        }

        let scope = self
            .forum_scope(viewer, request, &permitted, self_or_delegate)
            .await?;
        Ok(PermittedForums {
            courses: permitted.iter().map(|c| c.id).collect(),
            scope,
        })
    }

    /// Whether the forum shows up for the viewer at all.
    ///
    /// # Errors
    ///
    /// Propagates capability lookup failures.
    pub async fn is_user_visible(
        &self,
        viewer: &ViewerContext,
        forum: &Forum,
    ) -> Result<bool, DomainError> {
        if forum.visible {
            return Ok(true);
        }
        self.viewer_has(
            viewer,
            caps::COURSE_VIEW_HIDDEN_ACTIVITIES,
            ContextRef::Module(forum.id),
        )
        .await
    }

    /// Whether the viewer may read discussions of the forum.
    ///
    /// # Errors
    ///
    /// Propagates capability lookup failures.
    pub async fn can_view_discussions(
        &self,
        viewer: &ViewerContext,
        forum: &Forum,
    ) -> Result<bool, DomainError> {
        self.viewer_has(
            viewer,
            caps::FORUM_VIEW_DISCUSSION,
            ContextRef::Module(forum.id),
        )
        .await
    }

    /// Round the evaluation instant to the nearest multiple of the
    /// granularity (halves round up) so equal requests within one window
    /// produce identical predicates.
    #[must_use]
    pub fn rounded_instant(&self, at: OffsetDateTime) -> i64 {
        let granularity = i64::from(self.config.time_granularity_secs.max(1));
        let shifted = at.unix_timestamp() + granularity / 2;
        shifted - shifted.rem_euclid(granularity)
    }

    async fn is_self_or_delegate(
        &self,
        viewer: &ViewerContext,
        target_id: Uuid,
    ) -> Result<bool, DomainError> {
        if viewer.is_user(target_id) {
            return Ok(true);
        }
        if !viewer.is_logged_in() {
            return Ok(false);
        }

        let viewer_id = viewer.subject_id();
        let capabilities = &self.directory.capabilities;
        if !capabilities
            .has_user_context_assignment(viewer_id, target_id)
            .await?
        {
            return Ok(false);
        }

        let user_ctx = ContextRef::User(target_id);
        Ok(capabilities
            .has_capability(caps::USER_VIEW_DETAILS, user_ctx, viewer_id)
            .await?
            && capabilities
                .has_capability(caps::USER_READ_POSTS, user_ctx, viewer_id)
                .await?)
    }

    /// The target only needs to be able to see the course.
    async fn check_target_access(
        &self,
        course: &Course,
        target_id: Uuid,
    ) -> Result<Option<Denial>, DomainError> {
        let enrolments = &self.directory.enrolments;
        if enrolments.is_enrolled(course.id, target_id).await?
            || enrolments.is_viewing(course.id, target_id).await?
        {
            return Ok(None);
        }
        Ok(Some(Denial::NotEnrolled))
    }

    async fn check_viewer_access(
        &self,
        viewer: &ViewerContext,
        course: &Course,
        target_id: Uuid,
    ) -> Result<Option<Denial>, DomainError> {
        let enrolments = &self.directory.enrolments;
        if !enrolments.can_access_course(viewer, course.id).await? {
            return Ok(Some(Denial::PermissionDenied));
        }
        if !enrolments.is_enrolled(course.id, target_id).await? {
            return Ok(Some(Denial::NotEnrolled));
        }
        if course.enforces_separate_groups() {
            return self.check_shared_group(viewer, course, target_id).await;
        }
        Ok(None)
    }

    async fn check_shared_group(
        &self,
        viewer: &ViewerContext,
        course: &Course,
        target_id: Uuid,
    ) -> Result<Option<Denial>, DomainError> {
        let course_ctx = ContextRef::Course(course.id);
        if self
            .viewer_has(viewer, caps::ACCESS_ALL_GROUPS, course_ctx)
            .await?
            || self
                .directory
                .capabilities
                .has_capability(caps::ACCESS_ALL_GROUPS, course_ctx, target_id)
                .await?
        {
            return Ok(None);
        }

        // Guests hold no group memberships.
        if !viewer.is_authenticated() {
            return Ok(Some(Denial::LoginRequired));
        }

        let mine = self
            .group_ids(course.id, viewer.subject_id(), course.default_grouping)
            .await?;
        let theirs = self
            .group_ids(course.id, target_id, course.default_grouping)
            .await?;
        if mine.is_disjoint(&theirs) {
            return Ok(Some(Denial::GroupMismatch));
        }
        Ok(None)
    }

    async fn forum_scope(
        &self,
        viewer: &ViewerContext,
        request: &AccessRequest,
        courses: &[Course],
        self_or_delegate: bool,
    ) -> Result<PostScope, DomainError> {
        let target_id = request.target_id;
        let course_ids: Vec<Uuid> = courses.iter().map(|c| c.id).collect();
        let posted_in = self
            .directory
            .forums
            .forums_posted_in(
                target_id,
                &course_ids,
                request.discussions_only,
                request.forum_filter,
            )
            .await?;

        let mut scope = PostScope::default();
        if posted_in.is_empty() {
            return Ok(scope);
        }
        let at = self.rounded_instant(request.at);

        for course in courses {
            for forum in self.directory.forums.course_forums(course.id).await? {
                if !posted_in.contains(&forum.id) || !self.is_user_visible(viewer, &forum).await? {
                    continue;
                }
                if !self
                    .can_read_forum(viewer, &forum, target_id, self_or_delegate)
                    .await?
                {
                    debug!(forum_id = %forum.id, "forum not readable by viewer");
                    continue;
                }
                if self_or_delegate {
                    scope.grant_full_access(forum.id);
                    continue;
                }

                let filters = self
                    .forum_filters(viewer, course, &forum, target_id, at)
                    .await?;
                if !filters.is_empty() {
                    debug!(forum_id = %forum.id, filters = filters.len(), "forum restricted");
                }
                scope.restrict(ForumConstraint::new(forum.id, filters));
            }
        }
        Ok(scope)
    }

    async fn can_read_forum(
        &self,
        viewer: &ViewerContext,
        forum: &Forum,
        target_id: Uuid,
        self_or_delegate: bool,
    ) -> Result<bool, DomainError> {
        if self.can_view_discussions(viewer, forum).await? {
            return Ok(true);
        }
        if !self_or_delegate {
            return Ok(false);
        }
        Ok(self
            .directory
            .capabilities
            .has_capability(
                caps::FORUM_VIEW_DISCUSSION,
                ContextRef::Module(forum.id),
                target_id,
            )
            .await?)
    }

    async fn forum_filters(
        &self,
        viewer: &ViewerContext,
        course: &Course,
        forum: &Forum,
        target_id: Uuid,
        at: i64,
    ) -> Result<Vec<PostFilter>, DomainError> {
        let module_ctx = ContextRef::Module(forum.id);
        let mut filters = Vec::new();

        if forum.effective_group_mode(course) == GroupMode::Separate
            && !self
                .viewer_has(viewer, caps::ACCESS_ALL_GROUPS, module_ctx)
                .await?
        {
            let groups = if viewer.is_logged_in() {
                self.group_ids(course.id, viewer.subject_id(), forum.grouping_id)
                    .await?
                    .into_iter()
                    .collect()
            } else {
                Vec::new()
            };
            filters.push(PostFilter::GroupIn { groups });
        }

        if self.config.timed_posts_enabled
            && !self
                .viewer_has(viewer, caps::FORUM_VIEW_HIDDEN_TIMED_POSTS, module_ctx)
                .await?
        {
            filters.push(PostFilter::AuthoredOrVisibleAt {
                author: target_id,
                at,
            });
        }

        if forum.kind == ForumKind::QuestionAndAnswer
            && !self
                .viewer_has(viewer, caps::FORUM_VIEW_QANDA_WITHOUT_POSTING, module_ctx)
                .await?
        {
            let discussions = self
                .directory
                .forums
                .discussions_user_posted_in(forum.id, target_id)
                .await?;
            filters.push(if discussions.is_empty() {
                PostFilter::RootOnly
            } else {
                PostFilter::DiscussionInOrRoot { discussions }
            });
        }

        Ok(filters)
    }

    async fn viewer_has(
        &self,
        viewer: &ViewerContext,
        capability: &str,
        context: ContextRef,
    ) -> Result<bool, DomainError> {
        if !viewer.is_logged_in() {
            return Ok(false);
        }
        Ok(self
            .directory
            .capabilities
            .has_capability(capability, context, viewer.subject_id())
            .await?)
    }

    async fn group_ids(
        &self,
        course_id: Uuid,
        user_id: Uuid,
        grouping: Option<Uuid>,
    ) -> Result<BTreeSet<Uuid>, DomainError> {
        Ok(self
            .directory
            .groups
            .user_groups(course_id, user_id, grouping)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect())
    }
}
