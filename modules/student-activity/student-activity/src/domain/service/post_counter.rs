use std::sync::Arc;

use student_activity_sdk::{PostCountQuery, PostCountRequest, ViewerContext};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{AccessPolicy, AccessRequest, Directory, PermittedForums};
use crate::domain::error::DomainError;

/// Counts posts within a permitted scope.
pub struct PostCounter {
    directory: Directory,
    access: Arc<AccessPolicy>,
}

impl PostCounter {
    #[must_use]
    pub fn new(directory: Directory, access: Arc<AccessPolicy>) -> Self {
        Self { directory, access }
    }

    /// Count the target's posts inside `permitted`.
    ///
    /// An empty scope yields zero without querying the forum store.
    ///
    /// # Errors
    ///
    /// Propagates forum store failures.
    #[instrument(skip(self, permitted), fields(forums = permitted.scope.forum_ids().len()))]
    pub async fn count(
        &self,
        target_id: Uuid,
        permitted: &PermittedForums,
        discussions_only: bool,
    ) -> Result<u64, DomainError> {
        if permitted.is_empty() {
            debug!("no permitted forums");
            return Ok(0);
        }
        let query = PostCountQuery {
            author_id: target_id,
            scope: permitted.scope.clone(),
            discussions_only,
        };
        Ok(self.directory.forums.count_posts(&query).await?)
    }

    /// Evaluate access to one course (skipping it when inaccessible) and
    /// count the target's posts there.
    ///
    /// # Errors
    ///
    /// Propagates evaluation and forum store failures.
    pub async fn count_for(
        &self,
        viewer: &ViewerContext,
        target_id: Uuid,
        course_id: Uuid,
        forum_filter: Option<Uuid>,
        discussions_only: bool,
        at: OffsetDateTime,
    ) -> Result<u64, DomainError> {
        let request = AccessRequest {
            target_id,
            courses: vec![course_id],
            require_access: false,
            forum_filter,
            discussions_only,
            at,
        };
        let permitted = self.access.evaluate(viewer, &request).await?;
        self.count(target_id, &permitted, discussions_only).await
    }

    /// Count posts for a public client request.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown target user, or if the forum filter names
    ///   an unknown forum or a forum of another course
    /// - access errors when `require_access` is set
    /// - directory failures
    pub async fn count_request(
        &self,
        viewer: &ViewerContext,
        request: &PostCountRequest,
    ) -> Result<u64, DomainError> {
        if self
            .directory
            .enrolments
            .user(request.target_id)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("user", request.target_id));
        }
        if let Some(forum_id) = request.forum_id {
            let forum = self.directory.forums.forum(forum_id).await?;
            if forum.is_none_or(|f| f.course_id != request.course_id) {
                return Err(DomainError::not_found("forum", forum_id));
            }
        }
        let access = AccessRequest {
            target_id: request.target_id,
            courses: vec![request.course_id],
            require_access: request.require_access,
            forum_filter: request.forum_id,
            discussions_only: request.discussions_only,
            at: request.at,
        };
        let permitted = self.access.evaluate(viewer, &access).await?;
        self.count(request.target_id, &permitted, request.discussions_only)
            .await
    }
}
