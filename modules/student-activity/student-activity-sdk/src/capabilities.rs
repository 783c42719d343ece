//! Capability names checked by the report.
//!
//! Shared between the policy evaluator and collaborator implementations so
//! both sides agree on a single spelling.

/// Run the student activity report for a course.
pub const REPORT_VIEW: &str = "report.student_activity.view";

/// See profile details of another user (checked in the user context).
pub const USER_VIEW_DETAILS: &str = "user.view_details";

/// Read another user's forum posts (checked in the user context).
pub const USER_READ_POSTS: &str = "user.read_user_posts";

/// Ignore separate-groups restrictions.
pub const ACCESS_ALL_GROUPS: &str = "site.access_all_groups";

/// View discussions of a forum (checked in the module context).
pub const FORUM_VIEW_DISCUSSION: &str = "forum.view_discussion";

/// View timed discussions outside their visibility window.
pub const FORUM_VIEW_HIDDEN_TIMED_POSTS: &str = "forum.view_hidden_timed_posts";

/// View replies in question-and-answer forums without posting first.
pub const FORUM_VIEW_QANDA_WITHOUT_POSTING: &str = "forum.view_qanda_without_posting";

/// See modules hidden from students.
pub const COURSE_VIEW_HIDDEN_ACTIVITIES: &str = "course.view_hidden_activities";

/// See user fields the site hides by default (last access, groups).
pub const COURSE_VIEW_HIDDEN_USER_FIELDS: &str = "course.view_hidden_user_fields";

/// Assign roles in the course.
pub const ROLE_ASSIGN: &str = "role.assign";

/// Manage course groups.
pub const COURSE_MANAGE_GROUPS: &str = "course.manage_groups";
