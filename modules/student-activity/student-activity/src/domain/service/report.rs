use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use student_activity_sdk::capabilities as caps;
use student_activity_sdk::{
    ContextRef, Course, EnrolmentBadge, EnrolmentPeriod, Forum, Group, GroupBadge, MenuEntry,
    Paging, Participant, ParticipantRow, ReportColumn, ReportHeading, ReportRequest, Role,
    RoleBadge, RowLinks, StudentActivityReport, UserEnrolment, ViewerContext, ViewerPermissions,
};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use super::{AccessPolicy, Directory, PostCounter, Roster, ServiceConfig};
use crate::domain::error::DomainError;

/// Course-wide data shared by every row of one report page.
struct PageContext {
    course: Course,
    forum_filter: Option<Uuid>,
    group_filter: Option<Uuid>,
    at: OffsetDateTime,
    roles: HashMap<Uuid, Role>,
    assignable: BTreeSet<Uuid>,
    permissions: ViewerPermissions,
    show_groups: bool,
    show_last_access: bool,
}

/// Assembles report pages.
pub struct ReportService {
    directory: Directory,
    config: ServiceConfig,
    access: Arc<AccessPolicy>,
    posts: Arc<PostCounter>,
    roster: Arc<Roster>,
}

impl ReportService {
    #[must_use]
    pub fn new(
        directory: Directory,
        config: ServiceConfig,
        access: Arc<AccessPolicy>,
        posts: Arc<PostCounter>,
        roster: Arc<Roster>,
    ) -> Self {
        Self {
            directory,
            config,
            access,
            posts,
            roster,
        }
    }

    /// Build one page of the student activity report.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown course, or a group/forum filter that does
    ///   not belong to the course
    /// - `Validation` for the site course
    /// - `LoginRequired` for anonymous viewers, `PermissionDenied` without
    ///   the report capability
    /// - directory failures
    #[instrument(skip(self, viewer, request), fields(course_id = %request.course_id, page = request.page))]
    pub async fn build(
        &self,
        viewer: &ViewerContext,
        request: &ReportRequest,
    ) -> Result<StudentActivityReport, DomainError> {
        let course = self.authorize(viewer, request.course_id).await?;
        let group = self.group_filter(&course, request.group_id).await?;
        let forum = self.forum_filter(&course, request.forum_id).await?;
        let page = self.page_context(viewer, course, request).await?;

        let session = self.roster.session();
        let query = session.query(
            page.course.id,
            page.group_filter,
            request.sort,
            request.direction,
            request.page,
            request.per_page,
        );
        let participants = session.page(&query).await?;
        let total = session.total(page.course.id, page.group_filter).await?;

        let mut rows = Vec::with_capacity(participants.len());
        for participant in participants.iter() {
            rows.push(self.row(viewer, &page, participant).await?);
        }
        debug!(rows = rows.len(), total, "report page assembled");

        let columns = ReportColumn::ALL
            .into_iter()
            .filter(|c| match c {
                ReportColumn::Groups => page.show_groups,
                ReportColumn::LastAccess => page.show_last_access,
                _ => true,
            })
            .collect();

        Ok(StudentActivityReport {
            heading: ReportHeading {
                course_name: page.course.full_name.clone(),
                group_name: group.map(|g| g.name),
                forum_name: forum.map(|f| f.name),
            },
            columns,
            rows,
            paging: Paging {
                total,
                page: query.page,
                per_page: query.per_page,
            },
            group_menu: self.group_menu(&page).await?,
            forum_menu: self.forum_menu(viewer, &page).await?,
            sort: query.sort,
            direction: query.direction,
            permissions: page.permissions,
        })
    }

    async fn authorize(
        &self,
        viewer: &ViewerContext,
        course_id: Uuid,
    ) -> Result<Course, DomainError> {
        let course = self
            .directory
            .enrolments
            .course(course_id)
            .await?
            .ok_or_else(|| DomainError::not_found("course", course_id))?;
        if course.is_site {
            return Err(DomainError::validation(
                "course_id",
                "the site course has no activity report",
            ));
        }
        if !viewer.is_logged_in() {
            return Err(DomainError::LoginRequired);
        }
        if !self
            .directory
            .capabilities
            .has_capability(
                caps::REPORT_VIEW,
                ContextRef::Course(course.id),
                viewer.subject_id(),
            )
            .await?
        {
            return Err(DomainError::PermissionDenied);
        }
        Ok(course)
    }

    async fn group_filter(
        &self,
        course: &Course,
        group_id: Option<Uuid>,
    ) -> Result<Option<Group>, DomainError> {
        let Some(group_id) = group_id else {
            return Ok(None);
        };
        match self.directory.groups.group(group_id).await? {
            Some(group) if group.course_id == course.id => Ok(Some(group)),
            _ => Err(DomainError::not_found("group", group_id)),
        }
    }

    async fn forum_filter(
        &self,
        course: &Course,
        forum_id: Option<Uuid>,
    ) -> Result<Option<Forum>, DomainError> {
        let Some(forum_id) = forum_id else {
            return Ok(None);
        };
        match self.directory.forums.forum(forum_id).await? {
            Some(forum) if forum.course_id == course.id => Ok(Some(forum)),
            _ => Err(DomainError::not_found("forum", forum_id)),
        }
    }

    async fn page_context(
        &self,
        viewer: &ViewerContext,
        course: Course,
        request: &ReportRequest,
    ) -> Result<PageContext, DomainError> {
        let enrolments = &self.directory.enrolments;
        let capabilities = &self.directory.capabilities;
        let course_ctx = ContextRef::Course(course.id);
        let viewer_id = viewer.subject_id();

        let sees_hidden_fields = capabilities
            .has_capability(caps::COURSE_VIEW_HIDDEN_USER_FIELDS, course_ctx, viewer_id)
            .await?;
        let hidden: BTreeSet<ReportColumn> = if sees_hidden_fields {
            BTreeSet::new()
        } else {
            self.config
                .hidden_user_fields
                .iter()
                .map(|f| f.column())
                .collect()
        };

        let roles = enrolments
            .all_roles(course.id)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();
        let assignable = enrolments.assignable_roles(viewer, course.id).await?;
        let permissions = ViewerPermissions {
            can_assign_roles: capabilities
                .has_capability(caps::ROLE_ASSIGN, course_ctx, viewer_id)
                .await?,
            can_manage_groups: capabilities
                .has_capability(caps::COURSE_MANAGE_GROUPS, course_ctx, viewer_id)
                .await?,
        };

        Ok(PageContext {
            course,
            forum_filter: request.forum_id,
            group_filter: request.group_id,
            at: request.at,
            roles,
            assignable,
            permissions,
            show_groups: !hidden.contains(&ReportColumn::Groups),
            show_last_access: !hidden.contains(&ReportColumn::LastAccess),
        })
    }

    async fn row(
        &self,
        viewer: &ViewerContext,
        page: &PageContext,
        participant: &Participant,
    ) -> Result<ParticipantRow, DomainError> {
        let user = &participant.user;
        let course_id = page.course.id;

        let roles = self
            .directory
            .enrolments
            .user_roles(course_id, user.id)
            .await?
            .into_iter()
            .filter_map(|assignment| {
                let role = page.roles.get(&assignment.role_id)?;
                Some(RoleBadge {
                    role_id: role.id,
                    name: role.name.clone(),
                    unchangeable: !assignment.assignable
                        || !page.assignable.contains(&role.id),
                })
            })
            .collect();

        let groups = if page.show_groups {
            let groups = self
                .directory
                .groups
                .user_groups(course_id, user.id, None)
                .await?;
            Some(
                groups
                    .into_iter()
                    .map(|g| GroupBadge {
                        group_id: g.id,
                        name: g.name,
                    })
                    .collect(),
            )
        } else {
            None
        };

        let enrolments = self
            .directory
            .enrolments
            .user_enrolments(course_id, user.id)
            .await?
            .iter()
            .map(|ue| enrolment_badge(ue, page.at))
            .collect();

        let post_count = self
            .posts
            .count_for(viewer, user.id, course_id, page.forum_filter, false, page.at)
            .await?;
        let discussion_count = self
            .posts
            .count_for(viewer, user.id, course_id, page.forum_filter, true, page.at)
            .await?;

        Ok(ParticipantRow {
            user_id: user.id,
            full_name: user.full_name(),
            email: user.email.clone(),
            roles,
            groups,
            enrolments,
            last_course_access: participant
                .last_course_access
                .filter(|_| page.show_last_access),
            post_count,
            discussion_count,
            links: self.links(page, user.id)?,
        })
    }

    fn links(&self, page: &PageContext, user_id: Uuid) -> Result<RowLinks, DomainError> {
        let user = user_id.to_string();
        let course = page.course.id.to_string();
        let forum = page.forum_filter.map(|f| f.to_string());
        let group = page.group_filter.map(|g| g.to_string());

        let mut posts_params = vec![("id", user.clone()), ("course", course.clone())];
        if let Some(forum) = forum {
            posts_params.push(("forum", forum));
        }
        if let Some(group) = group {
            posts_params.push(("group", group));
        }
        let mut discussions_params = posts_params.clone();
        discussions_params.push(("mode", "discussions".to_owned()));

        Ok(RowLinks {
            posts: self.link("mod/forum/user.php", &posts_params)?,
            discussions: self.link("mod/forum/user.php", &discussions_params)?,
            complete_report: self.link(
                "report/outline/user.php",
                &[
                    ("id", user.clone()),
                    ("course", course.clone()),
                    ("mode", "complete".to_owned()),
                ],
            )?,
            all_logs: self.link(
                "report/log/index.php",
                &[
                    ("chooselog", "1".to_owned()),
                    ("showusers", "1".to_owned()),
                    ("id", course),
                    ("user", user),
                ],
            )?,
        })
    }

    fn link(&self, path: &str, params: &[(&str, String)]) -> Result<String, DomainError> {
        let mut url: Url = self
            .config
            .base_url
            .join(path)
            .map_err(|e| DomainError::Internal(format!("bad link path {path}: {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url.into())
    }

    async fn group_menu(&self, page: &PageContext) -> Result<Vec<MenuEntry>, DomainError> {
        let mut groups = self.directory.groups.course_groups(page.course.id).await?;
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups
            .into_iter()
            .map(|g| MenuEntry {
                selected: page.group_filter == Some(g.id),
                id: g.id,
                name: g.name,
            })
            .collect())
    }

    async fn forum_menu(
        &self,
        viewer: &ViewerContext,
        page: &PageContext,
    ) -> Result<Vec<MenuEntry>, DomainError> {
        let mut entries = Vec::new();
        for forum in self.directory.forums.course_forums(page.course.id).await? {
            if self.access.is_user_visible(viewer, &forum).await?
                && self.access.can_view_discussions(viewer, &forum).await?
            {
                entries.push(MenuEntry {
                    selected: page.forum_filter == Some(forum.id),
                    id: forum.id,
                    name: forum.name,
                });
            }
        }
        Ok(entries)
    }
}

/// Describe an enrolment the way the participants page does.
///
/// A disabled enrolment method shows no period and is always dimmed.
/// Otherwise the badge is dimmed when `at` lies outside the enrolment
/// period, the enrolment is suspended, or its instance is disabled.
#[must_use]
pub fn enrolment_badge(ue: &UserEnrolment, at: OffsetDateTime) -> EnrolmentBadge {
    let instance = &ue.instance;
    if !instance.method_enabled {
        return EnrolmentBadge {
            enrolment_id: ue.id,
            method: instance.method.clone(),
            name: instance.name.clone(),
            period: None,
            dimmed: true,
        };
    }

    let (period, outside) = match (ue.time_start, ue.time_end) {
        (Some(start), Some(end)) => (
            EnrolmentPeriod::StartEnd { start, end },
            at < start || at > end,
        ),
        (Some(start), None) => (EnrolmentPeriod::Start { start }, at < start),
        (None, Some(end)) => (EnrolmentPeriod::End { end }, at > end),
        (None, None) => (
            EnrolmentPeriod::Created {
                created: ue.time_created,
            },
            false,
        ),
    };

    EnrolmentBadge {
        enrolment_id: ue.id,
        method: instance.method.clone(),
        name: instance.name.clone(),
        period: Some(period),
        dimmed: outside || !ue.active || !instance.enabled,
    }
}
