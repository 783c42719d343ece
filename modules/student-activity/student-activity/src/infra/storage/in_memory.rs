//! In-memory directory backed by a serializable snapshot.
//!
//! Implements all four collaborator traits over a [`DirectorySnapshot`].
//! The CLI loads one from JSON; tests build them with fixtures.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use student_activity_sdk::capabilities as caps;
use student_activity_sdk::{
    CapabilityChecker, ContextRef, Course, DirectoryError, Discussion, EnrolmentSource, Forum,
    ForumStore, Group, GroupIndex, Participant, Post, PostCountQuery, Role, RoleAssignment,
    RosterQuery, SortDirection, SortField, UserEnrolment, UserRecord, ViewerContext,
};
use time::OffsetDateTime;
use uuid::Uuid;

/// A user's enrolment in one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrolmentRecord {
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub enrolment: UserEnrolment,
}

/// A (course, user) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CourseUser {
    pub course_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CourseAccess {
    pub course_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleAssignmentRecord {
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    #[serde(default = "assignable_by_default")]
    pub assignable: bool,
}

fn assignable_by_default() -> bool {
    true
}

/// `user_id` may assign `role_id` in `course_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignPermission {
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
}

/// A capability held by a user in a context.
///
/// Grants flow down: a site grant applies everywhere, a course grant applies
/// to the course and its forums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilityGrant {
    pub user_id: Uuid,
    pub capability: String,
    pub context: ContextRef,
}

/// `viewer_id` holds a role in `target_id`'s user context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserContextAssignment {
    pub viewer_id: Uuid,
    pub target_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub user_id: Uuid,
}

/// Everything the report reads, as one serializable document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectorySnapshot {
    pub users: Vec<UserRecord>,
    pub courses: Vec<Course>,
    pub enrolments: Vec<EnrolmentRecord>,
    /// Users who may view a course without being enrolled.
    pub course_viewers: Vec<CourseUser>,
    pub course_access: Vec<CourseAccess>,
    pub roles: Vec<Role>,
    pub role_assignments: Vec<RoleAssignmentRecord>,
    pub assign_permissions: Vec<AssignPermission>,
    pub capability_grants: Vec<CapabilityGrant>,
    pub user_context_assignments: Vec<UserContextAssignment>,
    pub groups: Vec<Group>,
    pub group_members: Vec<GroupMember>,
    pub forums: Vec<Forum>,
    pub discussions: Vec<Discussion>,
    pub posts: Vec<Post>,
}

/// Read-only directory over a snapshot.
pub struct InMemoryDirectory {
    snapshot: DirectorySnapshot,
    forums_by_id: HashMap<Uuid, Forum>,
    discussions_by_id: HashMap<Uuid, Discussion>,
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new(snapshot: DirectorySnapshot) -> Self {
        let forums_by_id = snapshot.forums.iter().map(|f| (f.id, f.clone())).collect();
        let discussions_by_id = snapshot
            .discussions
            .iter()
            .map(|d| (d.id, d.clone()))
            .collect();
        Self {
            snapshot,
            forums_by_id,
            discussions_by_id,
        }
    }

    /// # Errors
    ///
    /// Returns the parse error when `json` is not a valid snapshot.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    #[must_use]
    pub fn snapshot(&self) -> &DirectorySnapshot {
        &self.snapshot
    }

    fn enrolments_of(&self, course_id: Uuid, user_id: Uuid) -> impl Iterator<Item = &UserEnrolment> {
        self.snapshot
            .enrolments
            .iter()
            .filter(move |e| e.course_id == course_id && e.user_id == user_id)
            .map(|e| &e.enrolment)
    }

    fn has_active_enrolment(&self, course_id: Uuid, user_id: Uuid) -> bool {
        self.enrolments_of(course_id, user_id)
            .any(|e| e.active && e.instance.enabled && e.instance.method_enabled)
    }

    fn is_member(&self, group_id: Uuid, user_id: Uuid) -> bool {
        self.snapshot
            .group_members
            .iter()
            .any(|m| m.group_id == group_id && m.user_id == user_id)
    }

    /// Distinct users with any enrolment in the course, optionally limited
    /// to members of one group of that course.
    fn roster(&self, course_id: Uuid, group_id: Option<Uuid>) -> Vec<&UserRecord> {
        let enrolled: BTreeSet<Uuid> = self
            .snapshot
            .enrolments
            .iter()
            .filter(|e| e.course_id == course_id)
            .map(|e| e.user_id)
            .collect();
        let group_in_course = group_id.is_none_or(|g| {
            self.snapshot
                .groups
                .iter()
                .any(|grp| grp.id == g && grp.course_id == course_id)
        });
        if !group_in_course {
            return Vec::new();
        }
        self.snapshot
            .users
            .iter()
            .filter(|u| enrolled.contains(&u.id))
            .filter(|u| group_id.is_none_or(|g| self.is_member(g, u.id)))
            .collect()
    }

    fn last_course_access(&self, course_id: Uuid, user_id: Uuid) -> Option<OffsetDateTime> {
        self.snapshot
            .course_access
            .iter()
            .filter(|a| a.course_id == course_id && a.user_id == user_id)
            .map(|a| a.at)
            .max()
    }

    /// Whether a grant in `granted` covers a check in `wanted`.
    fn context_covers(&self, granted: ContextRef, wanted: ContextRef) -> bool {
        match (granted, wanted) {
            (ContextRef::Site, _) => true,
            (ContextRef::Course(c), ContextRef::Module(m)) => {
                self.forums_by_id.get(&m).is_some_and(|f| f.course_id == c)
            }
            (granted, wanted) => granted == wanted,
        }
    }
}

fn compare_participants(
    a: &Participant,
    b: &Participant,
    sort: SortField,
) -> Ordering {
    let (ua, ub) = (&a.user, &b.user);
    let by_last_first = || {
        ua.last_name
            .cmp(&ub.last_name)
            .then_with(|| ua.first_name.cmp(&ub.first_name))
    };
    match sort {
        SortField::FirstName => ua
            .first_name
            .cmp(&ub.first_name)
            .then_with(|| ua.last_name.cmp(&ub.last_name)),
        SortField::LastName => by_last_first(),
        SortField::Email => ua.email.cmp(&ub.email).then_with(by_last_first),
        SortField::LastAccess => a
            .last_course_access
            .cmp(&b.last_course_access)
            .then_with(by_last_first),
    }
}

fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

#[async_trait]
impl EnrolmentSource for InMemoryDirectory {
    async fn course(&self, course_id: Uuid) -> Result<Option<Course>, DirectoryError> {
        Ok(self
            .snapshot
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned())
    }

    async fn user(&self, user_id: Uuid) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self
            .snapshot
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned())
    }

    async fn can_access_course(
        &self,
        viewer: &ViewerContext,
        course_id: Uuid,
    ) -> Result<bool, DirectoryError> {
        if !viewer.is_logged_in() {
            return Ok(false);
        }
        let viewer_id = viewer.subject_id();
        Ok(self.has_active_enrolment(course_id, viewer_id)
            || self.is_viewing(course_id, viewer_id).await?)
    }

    async fn is_enrolled(&self, course_id: Uuid, user_id: Uuid) -> Result<bool, DirectoryError> {
        Ok(self.enrolments_of(course_id, user_id).next().is_some())
    }

    async fn is_viewing(&self, course_id: Uuid, user_id: Uuid) -> Result<bool, DirectoryError> {
        Ok(self
            .snapshot
            .course_viewers
            .iter()
            .any(|v| v.course_id == course_id && v.user_id == user_id))
    }

    async fn enrolled_users(
        &self,
        query: &RosterQuery,
    ) -> Result<Vec<Participant>, DirectoryError> {
        let mut participants: Vec<Participant> = self
            .roster(query.course_id, query.group_id)
            .into_iter()
            .map(|u| Participant {
                user: u.clone(),
                last_course_access: self.last_course_access(query.course_id, u.id),
            })
            .collect();

        participants.sort_by(|a, b| {
            let ord = compare_participants(a, b, query.sort);
            let ord = match query.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            ord.then_with(|| a.user.id.cmp(&b.user.id))
        });

        let skip = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(query.per_page).unwrap_or(usize::MAX);
        Ok(participants.into_iter().skip(skip).take(take).collect())
    }

    async fn count_enrolled_users(
        &self,
        course_id: Uuid,
        group_id: Option<Uuid>,
    ) -> Result<u64, DirectoryError> {
        Ok(to_u64(self.roster(course_id, group_id).len()))
    }

    async fn all_roles(&self, _course_id: Uuid) -> Result<Vec<Role>, DirectoryError> {
        Ok(self.snapshot.roles.clone())
    }

    async fn assignable_roles(
        &self,
        viewer: &ViewerContext,
        course_id: Uuid,
    ) -> Result<BTreeSet<Uuid>, DirectoryError> {
        if !viewer.is_authenticated() {
            return Ok(BTreeSet::new());
        }
        let course_ctx = ContextRef::Course(course_id);
        if !self
            .has_capability(caps::ROLE_ASSIGN, course_ctx, viewer.subject_id())
            .await?
        {
            return Ok(BTreeSet::new());
        }
        Ok(self
            .snapshot
            .assign_permissions
            .iter()
            .filter(|p| p.course_id == course_id && p.user_id == viewer.subject_id())
            .map(|p| p.role_id)
            .collect())
    }

    async fn user_roles(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, DirectoryError> {
        Ok(self
            .snapshot
            .role_assignments
            .iter()
            .filter(|a| a.course_id == course_id && a.user_id == user_id)
            .map(|a| RoleAssignment {
                role_id: a.role_id,
                assignable: a.assignable,
            })
            .collect())
    }

    async fn user_enrolments(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<UserEnrolment>, DirectoryError> {
        Ok(self.enrolments_of(course_id, user_id).cloned().collect())
    }
}

#[async_trait]
impl CapabilityChecker for InMemoryDirectory {
    async fn has_capability(
        &self,
        capability: &str,
        context: ContextRef,
        user_id: Uuid,
    ) -> Result<bool, DirectoryError> {
        Ok(self.snapshot.capability_grants.iter().any(|g| {
            g.user_id == user_id
                && g.capability == capability
                && self.context_covers(g.context, context)
        }))
    }

    async fn has_user_context_assignment(
        &self,
        viewer_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, DirectoryError> {
        Ok(self
            .snapshot
            .user_context_assignments
            .iter()
            .any(|a| a.viewer_id == viewer_id && a.target_id == target_id))
    }
}

#[async_trait]
impl GroupIndex for InMemoryDirectory {
    async fn course_groups(&self, course_id: Uuid) -> Result<Vec<Group>, DirectoryError> {
        Ok(self
            .snapshot
            .groups
            .iter()
            .filter(|g| g.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn user_groups(
        &self,
        course_id: Uuid,
        user_id: Uuid,
        grouping: Option<Uuid>,
    ) -> Result<Vec<Group>, DirectoryError> {
        Ok(self
            .snapshot
            .groups
            .iter()
            .filter(|g| g.course_id == course_id && g.in_grouping(grouping))
            .filter(|g| self.is_member(g.id, user_id))
            .cloned()
            .collect())
    }

    async fn group(&self, group_id: Uuid) -> Result<Option<Group>, DirectoryError> {
        Ok(self
            .snapshot
            .groups
            .iter()
            .find(|g| g.id == group_id)
            .cloned())
    }
}

#[async_trait]
impl ForumStore for InMemoryDirectory {
    async fn forum(&self, forum_id: Uuid) -> Result<Option<Forum>, DirectoryError> {
        Ok(self.forums_by_id.get(&forum_id).cloned())
    }

    async fn course_forums(&self, course_id: Uuid) -> Result<Vec<Forum>, DirectoryError> {
        Ok(self
            .snapshot
            .forums
            .iter()
            .filter(|f| f.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn forums_posted_in(
        &self,
        user_id: Uuid,
        courses: &[Uuid],
        discussions_only: bool,
        forum_filter: Option<Uuid>,
    ) -> Result<BTreeSet<Uuid>, DirectoryError> {
        Ok(self
            .snapshot
            .posts
            .iter()
            .filter(|p| p.author_id == user_id && (!discussions_only || p.is_root()))
            .filter_map(|p| self.discussions_by_id.get(&p.discussion_id))
            .filter_map(|d| self.forums_by_id.get(&d.forum_id))
            .filter(|f| courses.contains(&f.course_id))
            .filter(|f| forum_filter.is_none_or(|id| id == f.id))
            .map(|f| f.id)
            .collect())
    }

    async fn discussions_user_posted_in(
        &self,
        forum_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, DirectoryError> {
        let ids: BTreeSet<Uuid> = self
            .snapshot
            .posts
            .iter()
            .filter(|p| p.author_id == user_id)
            .filter_map(|p| self.discussions_by_id.get(&p.discussion_id))
            .filter(|d| d.forum_id == forum_id)
            .map(|d| d.id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn count_posts(&self, query: &PostCountQuery) -> Result<u64, DirectoryError> {
        let count = self
            .snapshot
            .posts
            .iter()
            .filter(|p| {
                self.discussions_by_id
                    .get(&p.discussion_id)
                    .is_some_and(|d| query.matches(p, d))
            })
            .count();
        Ok(to_u64(count))
    }
}
