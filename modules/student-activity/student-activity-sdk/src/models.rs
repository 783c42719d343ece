//! Read-only models consumed by the student activity report.
//!
//! Every entity here is a snapshot of a record owned by the host platform.
//! The report never writes any of them.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Basic identity of a user as shown in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Last time the user accessed the site at all.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_access: Option<OffsetDateTime>,
}

impl UserRecord {
    /// "First Last" display name.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Course or module group mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMode {
    /// Groups do not restrict anything.
    #[default]
    NoGroups,
    /// Members only see their own groups.
    Separate,
    /// Members see every group but only act in their own.
    Visible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub short_name: String,
    pub full_name: String,
    #[serde(default)]
    pub group_mode: GroupMode,
    /// When set, every module in the course uses the course group mode.
    #[serde(default)]
    pub group_mode_forced: bool,
    #[serde(default)]
    pub default_grouping: Option<Uuid>,
    /// The site front page pseudo-course. Reports are never built for it.
    #[serde(default)]
    pub is_site: bool,
}

impl Course {
    /// `true` when separate groups are enforced for every module in the course.
    #[must_use]
    pub fn enforces_separate_groups(&self) -> bool {
        self.group_mode == GroupMode::Separate && self.group_mode_forced
    }
}

/// Forum flavour. Only question-and-answer forums get special treatment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForumKind {
    #[default]
    General,
    QuestionAndAnswer,
    SingleDiscussion,
    EachUserOneDiscussion,
    Blog,
    News,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forum {
    pub id: Uuid,
    pub course_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub kind: ForumKind,
    /// Module-level group mode; overridden when the course forces its own.
    #[serde(default)]
    pub group_mode: GroupMode,
    #[serde(default)]
    pub grouping_id: Option<Uuid>,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
}

fn visible_by_default() -> bool {
    true
}

impl Forum {
    /// Group mode actually in effect for this forum.
    #[must_use]
    pub fn effective_group_mode(&self, course: &Course) -> GroupMode {
        if course.group_mode_forced {
            course.group_mode
        } else {
            self.group_mode
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: Uuid,
    pub forum_id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    /// `None` means the discussion is open to all participants.
    #[serde(default)]
    pub group_id: Option<Uuid>,
    /// Start of the visibility window (timed discussions).
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub time_start: Option<OffsetDateTime>,
    /// End of the visibility window; `None` keeps it open.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub time_end: Option<OffsetDateTime>,
}

impl Discussion {
    /// Whether the timed visibility window includes `at` (unix seconds).
    ///
    /// Unset bounds are open: no start means "already started", no end means
    /// "never ends".
    #[must_use]
    pub fn is_visible_at(&self, at: i64) -> bool {
        let started = self.time_start.is_none_or(|s| s.unix_timestamp() < at);
        let not_ended = self.time_end.is_none_or(|e| e.unix_timestamp() > at);
        started && not_ended
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub discussion_id: Uuid,
    pub author_id: Uuid,
    /// Parent post; `None` for the first post of a discussion.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub modified: OffsetDateTime,
}

impl Post {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub course_id: Uuid,
    pub name: String,
    /// Groupings this group belongs to.
    #[serde(default)]
    pub grouping_ids: Vec<Uuid>,
}

impl Group {
    /// Whether the group is part of `grouping` (`None` matches every group).
    #[must_use]
    pub fn in_grouping(&self, grouping: Option<Uuid>) -> bool {
        grouping.is_none_or(|g| self.grouping_ids.contains(&g))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub short_name: String,
    pub name: String,
}

/// A role a user holds in a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role_id: Uuid,
    /// `false` for assignments that cannot be changed from the course
    /// (inherited from a parent context or owned by an enrolment plugin).
    #[serde(default = "visible_by_default")]
    pub assignable: bool,
}

/// An enrolment method configured in a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolmentInstance {
    pub id: Uuid,
    /// Method identifier, e.g. `manual`, `self`, `cohort`.
    pub method: String,
    /// Display name of this instance.
    pub name: String,
    /// Instance status within the course.
    #[serde(default = "visible_by_default")]
    pub enabled: bool,
    /// Whether the method plugin is enabled site-wide.
    #[serde(default = "visible_by_default")]
    pub method_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEnrolment {
    pub id: Uuid,
    pub instance: EnrolmentInstance,
    /// `false` when the enrolment is suspended.
    #[serde(default = "visible_by_default")]
    pub active: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub time_start: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub time_end: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub time_created: OffsetDateTime,
}

/// Sortable roster columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    FirstName,
    #[default]
    LastName,
    Email,
    LastAccess,
}

impl SortField {
    /// Parse a column name; unknown names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "firstname" | "first_name" => Some(Self::FirstName),
            "lastname" | "last_name" => Some(Self::LastName),
            "email" => Some(Self::Email),
            "lastaccess" | "last_access" | "lastseen" => Some(Self::LastAccess),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything other than an explicit ascending request sorts descending.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }
}

/// One page of enrolled users, optionally restricted to a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RosterQuery {
    pub course_id: Uuid,
    pub group_id: Option<Uuid>,
    pub sort: SortField,
    pub direction: SortDirection,
    /// Zero-based page index.
    pub page: u32,
    pub per_page: u32,
}

impl RosterQuery {
    /// Number of rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.per_page)
    }
}

/// An enrolled user plus course-specific access data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user: UserRecord,
    /// Last time the user accessed this course.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_course_access: Option<OffsetDateTime>,
}
