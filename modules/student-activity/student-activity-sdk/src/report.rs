//! Request and response models of the student activity report.
//!
//! The report is plain typed data. Rendering (HTML, CSV, ...) is left to the
//! consumer; everything serializes to JSON.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{SortDirection, SortField};

/// Label used for the page title segment naming the report.
pub const REPORT_NAME: &str = "Student activity";

/// Label for the group segment when no group filter is applied.
pub const ALL_PARTICIPANTS: &str = "All participants";

/// Label for the forum segment when no forum filter is applied.
pub const ALL_FORUMS: &str = "All forums";

/// Parameters of one report page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub course_id: Uuid,
    /// Restrict rows to members of this group.
    #[serde(default)]
    pub group_id: Option<Uuid>,
    /// Count posts of this forum only.
    #[serde(default)]
    pub forum_id: Option<Uuid>,
    #[serde(default)]
    pub sort: SortField,
    #[serde(default)]
    pub direction: SortDirection,
    /// Zero-based page index.
    #[serde(default)]
    pub page: u32,
    /// Rows per page; the configured default is used when absent.
    #[serde(default)]
    pub per_page: Option<u32>,
    /// Evaluation instant for timed discussions and enrolment periods.
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

impl ReportRequest {
    /// First page of a course report, sorted by last name.
    #[must_use]
    pub fn for_course(course_id: Uuid, at: OffsetDateTime) -> Self {
        Self {
            course_id,
            group_id: None,
            forum_id: None,
            sort: SortField::default(),
            direction: SortDirection::default(),
            page: 0,
            per_page: None,
            at,
        }
    }
}

/// Count the posts one user wrote in one course, as seen by the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCountRequest {
    pub target_id: Uuid,
    pub course_id: Uuid,
    #[serde(default)]
    pub forum_id: Option<Uuid>,
    /// Count only posts that started a discussion.
    #[serde(default)]
    pub discussions_only: bool,
    /// Fail instead of returning zero when the viewer lacks course access.
    #[serde(default)]
    pub require_access: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// Report columns, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportColumn {
    FullName,
    Roles,
    Groups,
    Enrolments,
    LastAccess,
    Posts,
    Discussions,
    Links,
}

impl ReportColumn {
    pub const ALL: [Self; 8] = [
        Self::FullName,
        Self::Roles,
        Self::Groups,
        Self::Enrolments,
        Self::LastAccess,
        Self::Posts,
        Self::Discussions,
        Self::Links,
    ];
}

/// User fields the site can hide from viewers without the
/// view-hidden-user-fields capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HideableField {
    LastAccess,
    Groups,
}

impl HideableField {
    #[must_use]
    pub fn column(self) -> ReportColumn {
        match self {
            Self::LastAccess => ReportColumn::LastAccess,
            Self::Groups => ReportColumn::Groups,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBadge {
    pub role_id: Uuid,
    pub name: String,
    /// The viewer cannot unassign this role from the course.
    pub unchangeable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBadge {
    pub group_id: Uuid,
    pub name: String,
}

/// Time span shown next to an enrolment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnrolmentPeriod {
    StartEnd {
        #[serde(with = "time::serde::rfc3339")]
        start: OffsetDateTime,
        #[serde(with = "time::serde::rfc3339")]
        end: OffsetDateTime,
    },
    Start {
        #[serde(with = "time::serde::rfc3339")]
        start: OffsetDateTime,
    },
    End {
        #[serde(with = "time::serde::rfc3339")]
        end: OffsetDateTime,
    },
    /// No bounds; the creation time is shown instead.
    Created {
        #[serde(with = "time::serde::rfc3339")]
        created: OffsetDateTime,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolmentBadge {
    pub enrolment_id: Uuid,
    pub method: String,
    pub name: String,
    /// Absent when the enrolment method is disabled site-wide.
    pub period: Option<EnrolmentPeriod>,
    /// Rendered as inactive.
    pub dimmed: bool,
}

/// Navigation targets for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowLinks {
    pub posts: String,
    pub discussions: String,
    pub complete_report: String,
    pub all_logs: String,
}

/// One report row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRow {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub roles: Vec<RoleBadge>,
    /// `None` when the groups column is hidden.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupBadge>>,
    pub enrolments: Vec<EnrolmentBadge>,
    /// Last access to this course; `None` when never accessed or hidden.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_course_access: Option<OffsetDateTime>,
    pub post_count: u64,
    pub discussion_count: u64,
    pub links: RowLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: Uuid,
    pub name: String,
    pub selected: bool,
}

/// Title segments of the report page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportHeading {
    pub course_name: String,
    /// Selected group, or `None` for all participants.
    pub group_name: Option<String>,
    /// Selected forum, or `None` for all forums.
    pub forum_name: Option<String>,
}

impl ReportHeading {
    /// `course : Student activity : group : forum`.
    #[must_use]
    pub fn title(&self) -> String {
        format!(
            "{} : {} : {} : {}",
            self.course_name,
            REPORT_NAME,
            self.group_name.as_deref().unwrap_or(ALL_PARTICIPANTS),
            self.forum_name.as_deref().unwrap_or(ALL_FORUMS),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// Participants across all pages (group-filtered when applicable).
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl Paging {
    #[must_use]
    pub fn page_count(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.per_page))
    }
}

/// Course-level actions open to the viewer, for consumers that render
/// role and group controls next to the badges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerPermissions {
    pub can_assign_roles: bool,
    pub can_manage_groups: bool,
}

/// A fully assembled report page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentActivityReport {
    pub heading: ReportHeading,
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<ParticipantRow>,
    pub paging: Paging,
    pub group_menu: Vec<MenuEntry>,
    pub forum_menu: Vec<MenuEntry>,
    pub sort: SortField,
    pub direction: SortDirection,
    pub permissions: ViewerPermissions,
}
