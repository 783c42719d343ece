//! Local (in-process) client for the student activity report.

use std::sync::Arc;

use async_trait::async_trait;
use student_activity_sdk::{
    PostCountRequest, ReportRequest, StudentActivityClientV1, StudentActivityError,
    StudentActivityReport, ViewerContext,
};

use super::{DomainError, Service};

/// Local client wrapping the service.
pub struct StudentActivityLocalClient {
    svc: Arc<Service>,
}

impl StudentActivityLocalClient {
    #[must_use]
    pub fn new(svc: Arc<Service>) -> Self {
        Self { svc }
    }
}

fn log_and_convert(op: &str, e: DomainError) -> StudentActivityError {
    if e.is_denial() {
        tracing::warn!(operation = op, error = %e, "student_activity call denied");
    } else {
        tracing::error!(operation = op, error = ?e, "student_activity call failed");
    }
    e.into()
}

#[async_trait]
impl StudentActivityClientV1 for StudentActivityLocalClient {
    async fn count_posts(
        &self,
        viewer: &ViewerContext,
        request: PostCountRequest,
    ) -> Result<u64, StudentActivityError> {
        self.svc
            .posts
            .count_request(viewer, &request)
            .await
            .map_err(|e| log_and_convert("count_posts", e))
    }

    async fn build_report(
        &self,
        viewer: &ViewerContext,
        request: ReportRequest,
    ) -> Result<StudentActivityReport, StudentActivityError> {
        self.svc
            .reports
            .build(viewer, &request)
            .await
            .map_err(|e| log_and_convert("build_report", e))
    }
}
