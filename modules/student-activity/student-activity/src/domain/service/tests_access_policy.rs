#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use student_activity_sdk::capabilities as caps;
use student_activity_sdk::{ContextRef, ForumKind, GroupMode, PostFilter, ViewerContext};
use time::Duration;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::service::{AccessRequest, Service, ServiceConfig};
use crate::test_support::{
    CountingForumStore, Fixture, NOW, UnavailableForumStore, default_config,
    directory_with_forums, guest, manual_enrolment, viewer,
};

/// A course with a teacher and a student who may both read its forums.
struct Classroom {
    fx: Fixture,
    course: Uuid,
    teacher: Uuid,
    student: Uuid,
}

fn classroom(mode: GroupMode, forced: bool) -> Classroom {
    let mut fx = Fixture::new();
    let course = fx.course_with_mode("Biology", mode, forced);
    let teacher = fx.user("Tess", "Teacher");
    let student = fx.user("Sam", "Student");
    fx.enrol(course, teacher);
    fx.enrol(course, student);
    fx.grant_in_course(teacher, course, &[caps::FORUM_VIEW_DISCUSSION]);
    fx.grant_in_course(student, course, &[caps::FORUM_VIEW_DISCUSSION]);
    Classroom {
        fx,
        course,
        teacher,
        student,
    }
}

fn request(target_id: Uuid, course_id: Uuid) -> AccessRequest {
    AccessRequest {
        target_id,
        courses: vec![course_id],
        require_access: false,
        forum_filter: None,
        discussions_only: false,
        at: NOW,
    }
}

async fn count(
    svc: &Service,
    viewer: &ViewerContext,
    target_id: Uuid,
    course_id: Uuid,
    discussions_only: bool,
) -> u64 {
    svc.posts
        .count_for(viewer, target_id, course_id, None, discussions_only, NOW)
        .await
        .unwrap()
}

#[tokio::test]
async fn own_posts_count_roots_and_replies() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::NoGroups, false);
    let forum = fx.forum(course, "General", ForumKind::General);
    for _ in 0..3 {
        fx.discussion(forum, student);
    }
    let other = fx.discussion(forum, teacher);
    fx.reply(other, student);
    fx.reply(other, student);
    let svc = fx.service();

    let me = viewer(student);
    assert_eq!(count(&svc, &me, student, course, false).await, 5);
    assert_eq!(count(&svc, &me, student, course, true).await, 3);
}

#[tokio::test]
async fn self_view_ignores_groups_and_timing() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::Separate, true);
    let general = fx.forum(course, "General", ForumKind::General);
    let qanda = fx.forum(course, "Questions", ForumKind::QuestionAndAnswer);
    let group = fx.group(course, "Lab A");
    fx.join(group, teacher);

    fx.discussion_in_group(general, student, Some(group));
    let timed = fx.discussion(general, teacher);
    fx.discussion_mut(timed).time_start = Some(NOW + Duration::days(3));
    fx.reply(timed, student);
    let question = fx.discussion(qanda, teacher);
    fx.reply(question, student);
    let svc = fx.service();

    let me = viewer(student);
    let permitted = svc
        .access
        .evaluate(&me, &request(student, course))
        .await
        .unwrap();
    assert_eq!(permitted.courses, vec![course]);
    assert!(permitted.scope.has_full_access(general));
    assert!(permitted.scope.has_full_access(qanda));
    assert!(permitted.scope.restricted().is_empty());

    assert_eq!(count(&svc, &me, student, course, false).await, 3);
}

#[tokio::test]
async fn separate_groups_without_shared_group_permit_nothing() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::Separate, true);
    let forum = fx.forum(course, "General", ForumKind::General);
    let lab_a = fx.group(course, "Lab A");
    let lab_b = fx.group(course, "Lab B");
    fx.join(lab_a, teacher);
    fx.join(lab_b, student);
    fx.discussion(forum, student);
    let d = fx.discussion(forum, teacher);
    fx.reply(d, student);
    let svc = fx.service();

    let permitted = svc
        .access
        .evaluate(&viewer(teacher), &request(student, course))
        .await
        .unwrap();
    assert!(permitted.courses.is_empty());
    assert!(permitted.is_empty());
    assert_eq!(count(&svc, &viewer(teacher), student, course, false).await, 0);

    let strict = AccessRequest {
        require_access: true,
        ..request(student, course)
    };
    let err = svc
        .access
        .evaluate(&viewer(teacher), &strict)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::group_mismatch(course));
}

#[tokio::test]
async fn access_all_groups_skips_shared_group_check() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::Separate, true);
    let forum = fx.forum(course, "General", ForumKind::General);
    let lab_b = fx.group(course, "Lab B");
    fx.join(lab_b, student);
    fx.discussion_in_group(forum, student, Some(lab_b));
    fx.grant_in_course(
        teacher,
        course,
        &[caps::ACCESS_ALL_GROUPS, caps::FORUM_VIEW_HIDDEN_TIMED_POSTS],
    );
    let svc = fx.service();

    let permitted = svc
        .access
        .evaluate(&viewer(teacher), &request(student, course))
        .await
        .unwrap();
    assert_eq!(permitted.courses, vec![course]);
    assert!(permitted.scope.constraint_for(forum).is_none());
    assert!(permitted.scope.has_full_access(forum));
    assert_eq!(count(&svc, &viewer(teacher), student, course, false).await, 1);
}

#[tokio::test]
async fn separate_forum_limits_posts_to_viewer_groups() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::Separate, true);
    let forum = fx.forum(course, "General", ForumKind::General);
    let lab_a = fx.group(course, "Lab A");
    let lab_b = fx.group(course, "Lab B");
    fx.join(lab_a, teacher);
    fx.join(lab_a, student);
    fx.join(lab_b, student);
    fx.discussion_in_group(forum, student, Some(lab_a));
    fx.discussion_in_group(forum, student, Some(lab_b));
    fx.discussion(forum, student);
    fx.grant_in_course(teacher, course, &[caps::FORUM_VIEW_HIDDEN_TIMED_POSTS]);
    let svc = fx.service();

    let permitted = svc
        .access
        .evaluate(&viewer(teacher), &request(student, course))
        .await
        .unwrap();
    let constraint = permitted.scope.constraint_for(forum).unwrap();
    assert_eq!(
        constraint.filters(),
        &[PostFilter::GroupIn {
            groups: vec![lab_a]
        }]
    );

    // Lab A and the all-participants discussion, not Lab B.
    assert_eq!(count(&svc, &viewer(teacher), student, course, false).await, 2);
}

#[tokio::test]
async fn qanda_forum_restricts_to_target_discussions_and_roots() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::NoGroups, false);
    let qanda = fx.forum(course, "Questions", ForumKind::QuestionAndAnswer);
    let answered = fx.discussion(qanda, teacher);
    fx.reply(answered, student);
    fx.grant_in_course(teacher, course, &[caps::FORUM_VIEW_HIDDEN_TIMED_POSTS]);
    let svc = fx.service();

    let permitted = svc
        .access
        .evaluate(&viewer(teacher), &request(student, course))
        .await
        .unwrap();
    assert_eq!(
        permitted.scope.constraint_for(qanda).unwrap().filters(),
        &[PostFilter::DiscussionInOrRoot {
            discussions: vec![answered]
        }]
    );
    assert_eq!(count(&svc, &viewer(teacher), student, course, false).await, 1);
}

#[tokio::test]
async fn qanda_forum_without_target_discussions_counts_roots_only() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::NoGroups, false);
    let qanda = fx.forum(course, "Questions", ForumKind::QuestionAndAnswer);
    let own = fx.discussion(qanda, student);
    let answered = fx.discussion(qanda, teacher);
    fx.reply(answered, student);
    fx.reply(own, student);
    fx.grant_in_course(teacher, course, &[caps::FORUM_VIEW_HIDDEN_TIMED_POSTS]);

    let backend = fx.directory();
    let mut store = CountingForumStore::new(backend.clone());
    store.hide_posted_discussions = true;
    let directory = directory_with_forums(backend, Arc::new(store));
    let svc = Service::new(&directory, &default_config());

    let permitted = svc
        .access
        .evaluate(&viewer(teacher), &request(student, course))
        .await
        .unwrap();
    assert_eq!(
        permitted.scope.constraint_for(qanda).unwrap().filters(),
        &[PostFilter::RootOnly]
    );
    assert_eq!(count(&svc, &viewer(teacher), student, course, false).await, 1);
}

#[tokio::test]
async fn qanda_capability_lifts_the_restriction() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::NoGroups, false);
    let qanda = fx.forum(course, "Questions", ForumKind::QuestionAndAnswer);
    let answered = fx.discussion(qanda, teacher);
    fx.reply(answered, student);
    fx.grant_in_course(
        teacher,
        course,
        &[
            caps::FORUM_VIEW_HIDDEN_TIMED_POSTS,
            caps::FORUM_VIEW_QANDA_WITHOUT_POSTING,
        ],
    );
    let svc = fx.service();

    let permitted = svc
        .access
        .evaluate(&viewer(teacher), &request(student, course))
        .await
        .unwrap();
    assert!(permitted.scope.has_full_access(qanda));
}

#[tokio::test]
async fn timed_discussions_outside_window_are_hidden_unless_authored_by_target() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::NoGroups, false);
    let forum = fx.forum(course, "General", ForumKind::General);
    let other = fx.user("Olga", "Other");
    fx.enrol(course, other);

    let upcoming = fx.discussion(forum, other);
    fx.discussion_mut(upcoming).time_start = Some(NOW + Duration::days(1));
    fx.reply(upcoming, student);

    let expired = fx.discussion(forum, other);
    fx.discussion_mut(expired).time_end = Some(NOW - Duration::days(1));
    fx.reply(expired, student);

    let own = fx.discussion(forum, student);
    fx.discussion_mut(own).time_start = Some(NOW + Duration::days(1));

    let open = fx.discussion(forum, other);
    fx.discussion_mut(open).time_start = Some(NOW - Duration::days(1));
    fx.reply(open, student);
    let svc = fx.service();

    let permitted = svc
        .access
        .evaluate(&viewer(teacher), &request(student, course))
        .await
        .unwrap();
    assert_eq!(
        permitted.scope.constraint_for(forum).unwrap().filters(),
        &[PostFilter::AuthoredOrVisibleAt {
            author: student,
            at: NOW.unix_timestamp(),
        }]
    );

    // The reply in `open` plus the root of `own`.
    assert_eq!(count(&svc, &viewer(teacher), student, course, false).await, 2);
}

#[tokio::test]
async fn hidden_timed_posts_capability_sees_everything() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::NoGroups, false);
    let forum = fx.forum(course, "General", ForumKind::General);
    let upcoming = fx.discussion(forum, teacher);
    fx.discussion_mut(upcoming).time_start = Some(NOW + Duration::days(1));
    fx.reply(upcoming, student);
    fx.grant(
        teacher,
        caps::FORUM_VIEW_HIDDEN_TIMED_POSTS,
        ContextRef::Module(forum),
    );
    let svc = fx.service();

    assert_eq!(count(&svc, &viewer(teacher), student, course, false).await, 1);
}

#[tokio::test]
async fn timed_filter_is_skipped_when_disabled() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::NoGroups, false);
    let forum = fx.forum(course, "General", ForumKind::General);
    let upcoming = fx.discussion(forum, teacher);
    fx.discussion_mut(upcoming).time_start = Some(NOW + Duration::days(1));
    fx.reply(upcoming, student);
    let config = ServiceConfig {
        timed_posts_enabled: false,
        ..default_config()
    };
    let svc = fx.service_with(&config);

    let permitted = svc
        .access
        .evaluate(&viewer(teacher), &request(student, course))
        .await
        .unwrap();
    assert!(permitted.scope.has_full_access(forum));
    assert_eq!(count(&svc, &viewer(teacher), student, course, false).await, 1);
}

#[tokio::test]
async fn evaluation_instant_is_rounded_to_nearest_window() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::NoGroups, false);
    let forum = fx.forum(course, "General", ForumKind::General);
    let starting = fx.discussion(forum, teacher);
    fx.discussion_mut(starting).time_start = Some(NOW + Duration::seconds(30));
    fx.reply(starting, student);
    let svc = fx.service();

    let ts = NOW.unix_timestamp();
    assert_eq!(svc.access.rounded_instant(NOW + Duration::seconds(49)), ts);
    assert_eq!(svc.access.rounded_instant(NOW + Duration::seconds(50)), ts + 100);
    assert_eq!(svc.access.rounded_instant(NOW - Duration::seconds(50)), ts);
    assert_eq!(svc.access.rounded_instant(NOW - Duration::seconds(51)), ts - 100);

    let tess = viewer(teacher);
    // Rounds back to NOW, before the discussion starts.
    let early = svc
        .posts
        .count_for(&tess, student, course, None, false, NOW + Duration::seconds(40))
        .await
        .unwrap();
    assert_eq!(early, 0);
    // Rounds forward past the start.
    let late = svc
        .posts
        .count_for(&tess, student, course, None, false, NOW + Duration::seconds(50))
        .await
        .unwrap();
    assert_eq!(late, 1);
}

#[tokio::test]
async fn counting_is_idempotent() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::Separate, true);
    let forum = fx.forum(course, "General", ForumKind::General);
    let lab = fx.group(course, "Lab A");
    fx.join(lab, teacher);
    fx.join(lab, student);
    fx.discussion_in_group(forum, student, Some(lab));
    let d = fx.discussion(forum, teacher);
    fx.reply(d, student);
    let svc = fx.service();

    let first = svc
        .access
        .evaluate(&viewer(teacher), &request(student, course))
        .await
        .unwrap();
    let second = svc
        .access
        .evaluate(&viewer(teacher), &request(student, course))
        .await
        .unwrap();
    assert_eq!(first, second);

    let a = count(&svc, &viewer(teacher), student, course, false).await;
    let b = count(&svc, &viewer(teacher), student, course, false).await;
    assert_eq!(a, 2);
    assert_eq!(a, b);
}

#[tokio::test]
async fn require_access_fails_when_target_not_enrolled() {
    let mut fx = Fixture::new();
    let course = fx.course("Chemistry");
    let teacher = fx.user("Tess", "Teacher");
    let outsider = fx.user("Otto", "Outsider");
    fx.enrol(course, teacher);
    let backend = fx.directory();
    let store = Arc::new(CountingForumStore::new(backend.clone()));
    let directory = directory_with_forums(backend, store.clone());
    let svc = Service::new(&directory, &default_config());

    let strict = AccessRequest {
        require_access: true,
        ..request(outsider, course)
    };
    let err = svc
        .access
        .evaluate(&viewer(teacher), &strict)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::not_enrolled(course, outsider));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn suspended_target_enrolment_still_counts() {
    let mut fx = Fixture::new();
    let course = fx.course("Chemistry");
    let teacher = fx.user("Tess", "Teacher");
    let student = fx.user("Sam", "Student");
    fx.enrol(course, teacher);
    let mut suspended = manual_enrolment();
    suspended.active = false;
    fx.enrol_with(course, student, suspended);
    fx.grant_in_course(teacher, course, &[caps::FORUM_VIEW_DISCUSSION]);
    let forum = fx.forum(course, "General", ForumKind::General);
    fx.discussion(forum, student);
    fx.discussion(forum, student);
    let svc = fx.service();

    assert_eq!(count(&svc, &viewer(teacher), student, course, false).await, 2);

    let strict = AccessRequest {
        require_access: true,
        ..request(student, course)
    };
    let permitted = svc
        .access
        .evaluate(&viewer(teacher), &strict)
        .await
        .unwrap();
    assert_eq!(permitted.courses, vec![course]);
}

#[tokio::test]
async fn viewer_with_disabled_enrolment_cannot_enter_course() {
    let mut fx = Fixture::new();
    let course = fx.course("Chemistry");
    let teacher = fx.user("Tess", "Teacher");
    let student = fx.user("Sam", "Student");
    let mut disabled = manual_enrolment();
    disabled.instance.enabled = false;
    fx.enrol_with(course, teacher, disabled);
    fx.enrol(course, student);
    let svc = fx.service();

    let strict = AccessRequest {
        require_access: true,
        ..request(student, course)
    };
    let err = svc
        .access
        .evaluate(&viewer(teacher), &strict)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::PermissionDenied);
}

#[tokio::test]
async fn inaccessible_courses_are_skipped_unless_required() {
    let mut fx = Fixture::new();
    let open = fx.course("Open");
    let closed = fx.course("Closed");
    let teacher = fx.user("Tess", "Teacher");
    let student = fx.user("Sam", "Student");
    fx.enrol(open, teacher);
    fx.enrol(open, student);
    fx.enrol(closed, student);
    let svc = fx.service();

    let lenient = AccessRequest {
        courses: vec![open, closed],
        ..request(student, open)
    };
    let permitted = svc
        .access
        .evaluate(&viewer(teacher), &lenient)
        .await
        .unwrap();
    assert_eq!(permitted.courses, vec![open]);

    let strict = AccessRequest {
        require_access: true,
        ..lenient
    };
    let err = svc
        .access
        .evaluate(&viewer(teacher), &strict)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::PermissionDenied);
}

#[tokio::test]
async fn require_access_with_no_courses_is_denied() {
    let svc = Fixture::new().service();
    let req = AccessRequest {
        courses: Vec::new(),
        require_access: true,
        ..request(Uuid::new_v4(), Uuid::new_v4())
    };
    let err = svc
        .access
        .evaluate(&viewer(Uuid::new_v4()), &req)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::PermissionDenied);
}

#[tokio::test]
async fn unknown_course_is_not_found() {
    let svc = Fixture::new().service();
    let course = Uuid::new_v4();
    let err = svc
        .access
        .evaluate(&viewer(Uuid::new_v4()), &request(Uuid::new_v4(), course))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::not_found("course", course));
}

#[tokio::test]
async fn guest_under_enforced_separate_groups_must_log_in() {
    let Classroom {
        mut fx,
        course,
        student,
        ..
    } = classroom(GroupMode::Separate, true);
    let visitor = fx.user("Gus", "Guest");
    fx.view_without_enrolment(course, visitor);
    let svc = fx.service();

    let strict = AccessRequest {
        require_access: true,
        ..request(student, course)
    };
    let err = svc
        .access
        .evaluate(&guest(visitor), &strict)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::LoginRequired);

    let lenient = svc
        .access
        .evaluate(&guest(visitor), &request(student, course))
        .await
        .unwrap();
    assert!(lenient.is_empty());
}

#[tokio::test]
async fn anonymous_viewer_sees_nothing() {
    let Classroom {
        mut fx,
        course,
        student,
        ..
    } = classroom(GroupMode::NoGroups, false);
    let forum = fx.forum(course, "General", ForumKind::General);
    fx.discussion(forum, student);
    let svc = fx.service();

    let err = svc
        .access
        .evaluate(
            &ViewerContext::anonymous(),
            &AccessRequest {
                require_access: true,
                ..request(student, course)
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::PermissionDenied);
}

#[tokio::test]
async fn delegate_sees_target_forums_in_full() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::Separate, true);
    let forum = fx.forum(course, "General", ForumKind::General);
    let lab = fx.group(course, "Lab A");
    fx.join(lab, student);
    fx.discussion_in_group(forum, student, Some(lab));
    let d = fx.discussion(forum, teacher);
    fx.discussion_mut(d).time_start = Some(NOW + Duration::days(2));
    fx.reply(d, student);

    // Not enrolled and holding no forum capability of their own.
    let parent = fx.user("Pat", "Parent");
    fx.delegate(parent, student);
    let svc = fx.service();

    let permitted = svc
        .access
        .evaluate(&viewer(parent), &request(student, course))
        .await
        .unwrap();
    assert!(permitted.scope.has_full_access(forum));
    assert_eq!(count(&svc, &viewer(parent), student, course, false).await, 2);
}

#[tokio::test]
async fn user_context_assignment_without_capabilities_is_not_a_delegate() {
    let Classroom {
        mut fx,
        course,
        student,
        ..
    } = classroom(GroupMode::NoGroups, false);
    let forum = fx.forum(course, "General", ForumKind::General);
    fx.discussion(forum, student);
    let parent = fx.user("Pat", "Parent");
    fx.snapshot.user_context_assignments.push(
        crate::infra::storage::in_memory::UserContextAssignment {
            viewer_id: parent,
            target_id: student,
        },
    );
    let svc = fx.service();

    let permitted = svc
        .access
        .evaluate(&viewer(parent), &request(student, course))
        .await
        .unwrap();
    assert!(permitted.is_empty());
}

#[tokio::test]
async fn hidden_forums_need_the_hidden_activities_capability() {
    let Classroom {
        mut fx,
        course,
        teacher,
        student,
    } = classroom(GroupMode::NoGroups, false);
    let forum = fx.forum(course, "Staff only", ForumKind::General);
    fx.forum_mut(forum).visible = false;
    fx.discussion(forum, student);
    fx.grant_in_course(teacher, course, &[caps::FORUM_VIEW_HIDDEN_TIMED_POSTS]);
    let mut with_cap = Fixture {
        snapshot: fx.snapshot.clone(),
    };
    with_cap.grant(
        teacher,
        caps::COURSE_VIEW_HIDDEN_ACTIVITIES,
        ContextRef::Module(forum),
    );

    let svc = fx.service();
    assert_eq!(count(&svc, &viewer(teacher), student, course, false).await, 0);

    let svc = with_cap.service();
    assert_eq!(count(&svc, &viewer(teacher), student, course, false).await, 1);
}

#[tokio::test]
async fn forums_the_viewer_cannot_read_are_left_out() {
    let mut fx = Fixture::new();
    let course = fx.course("Physics");
    let teacher = fx.user("Tess", "Teacher");
    let student = fx.user("Sam", "Student");
    fx.enrol(course, teacher);
    fx.enrol(course, student);
    let readable = fx.forum(course, "Readable", ForumKind::General);
    let closed = fx.forum(course, "Closed", ForumKind::General);
    fx.grant(teacher, caps::FORUM_VIEW_DISCUSSION, ContextRef::Module(readable));
    fx.discussion(readable, student);
    fx.discussion(closed, student);
    let svc = fx.service();

    let permitted = svc
        .access
        .evaluate(&viewer(teacher), &request(student, course))
        .await
        .unwrap();
    assert_eq!(permitted.scope.forum_ids().into_iter().collect::<Vec<_>>(), vec![readable]);
}

#[tokio::test]
async fn forum_filter_limits_scope_to_one_forum() {
    let Classroom {
        mut fx,
        course,
        student,
        ..
    } = classroom(GroupMode::NoGroups, false);
    let first = fx.forum(course, "First", ForumKind::General);
    let second = fx.forum(course, "Second", ForumKind::General);
    fx.discussion(first, student);
    fx.discussion(second, student);
    let svc = fx.service();

    let permitted = svc
        .access
        .evaluate(
            &viewer(student),
            &AccessRequest {
                forum_filter: Some(second),
                ..request(student, course)
            },
        )
        .await
        .unwrap();
    assert_eq!(
        permitted.scope.forum_ids().into_iter().collect::<Vec<_>>(),
        vec![second]
    );
}

#[tokio::test]
async fn empty_scope_does_not_query_the_store() {
    let Classroom { fx, course, student, .. } = classroom(GroupMode::NoGroups, false);
    let backend = fx.directory();
    let store = Arc::new(CountingForumStore::new(backend.clone()));
    let directory = directory_with_forums(backend, store.clone());
    let svc = Service::new(&directory, &default_config());

    let n = count(&svc, &viewer(student), student, course, false).await;
    assert_eq!(n, 0);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn store_outage_surfaces_as_unavailable() {
    let Classroom { fx, course, student, .. } = classroom(GroupMode::NoGroups, false);
    let directory = directory_with_forums(fx.directory(), Arc::new(UnavailableForumStore));
    let svc = Service::new(&directory, &default_config());

    let err = svc
        .access
        .evaluate(&viewer(student), &request(student, course))
        .await
        .unwrap_err();
    assert!(
        matches!(err, DomainError::DirectoryUnavailable { .. }),
        "expected DirectoryUnavailable, got: {err:?}"
    );
}
