//! Domain service layer - business logic and rules.
//!
//! ## Architecture
//!
//! Per-concern submodules, composed bottom-up:
//! - `access_policy` - decides which courses and forums a viewer may count
//!   another user's posts in, and under which per-forum restrictions
//! - `post_counter` - turns a permitted scope into one count query
//! - `roster` - enrolled-user pages and totals with a request-scoped cache
//! - `report` - assembles one report page from the services above
//!
//! ## Layering Rules
//!
//! The domain layer:
//! - **MAY** import: `student_activity_sdk` (contract types and collaborator traits)
//! - **MUST NOT** import: `infra::*`; storage is reached only through the
//!   collaborator traits bundled in [`Directory`]
//!
//! ## Viewer
//!
//! Every operation takes the acting user as an explicit
//! [`ViewerContext`](student_activity_sdk::ViewerContext). Nothing reads a
//! "current user" from ambient state.

use std::sync::Arc;

use student_activity_sdk::{
    CapabilityChecker, EnrolmentSource, ForumStore, GroupIndex, HideableField,
};
use url::Url;

use crate::config::{ConfigError, StudentActivityConfig};

mod access_policy;
mod post_counter;
mod report;
mod roster;

#[cfg(test)]
mod tests_access_policy;

pub use access_policy::{AccessPolicy, AccessRequest, PermittedForums};
pub use post_counter::PostCounter;
pub use report::ReportService;
pub use roster::{Roster, RosterSession};

/// The collaborator interfaces the services read through.
#[derive(Clone)]
pub struct Directory {
    pub enrolments: Arc<dyn EnrolmentSource>,
    pub capabilities: Arc<dyn CapabilityChecker>,
    pub groups: Arc<dyn GroupIndex>,
    pub forums: Arc<dyn ForumStore>,
}

impl Directory {
    /// Use one backend for all four interfaces.
    #[must_use]
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: EnrolmentSource + CapabilityChecker + GroupIndex + ForumStore + 'static,
    {
        Self {
            enrolments: backend.clone(),
            capabilities: backend.clone(),
            groups: backend.clone(),
            forums: backend,
        }
    }
}

/// Service configuration, derived from [`StudentActivityConfig`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: Url,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub roster_cache_capacity: usize,
    pub timed_posts_enabled: bool,
    pub time_granularity_secs: u32,
    pub hidden_user_fields: Vec<HideableField>,
}

impl ServiceConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the configuration fails validation.
    pub fn from_config(config: &StudentActivityConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            base_url: config.parsed_base_url()?,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            roster_cache_capacity: config.roster_cache_capacity,
            timed_posts_enabled: config.timed_posts_enabled,
            time_granularity_secs: config.time_granularity_secs,
            hidden_user_fields: config.hidden_user_fields.clone(),
        })
    }
}

/// All services of the module, wired over one [`Directory`].
pub struct Service {
    pub access: Arc<AccessPolicy>,
    pub posts: Arc<PostCounter>,
    pub roster: Arc<Roster>,
    pub reports: Arc<ReportService>,
}

impl Service {
    #[must_use]
    pub fn new(directory: &Directory, config: &ServiceConfig) -> Self {
        let access = Arc::new(AccessPolicy::new(directory.clone(), config.clone()));
        let posts = Arc::new(PostCounter::new(directory.clone(), access.clone()));
        let roster = Arc::new(Roster::new(directory.enrolments.clone(), config));
        let reports = Arc::new(ReportService::new(
            directory.clone(),
            config.clone(),
            access.clone(),
            posts.clone(),
            roster.clone(),
        ));
        Self {
            access,
            posts,
            roster,
            reports,
        }
    }
}
