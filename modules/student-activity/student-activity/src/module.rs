use std::sync::Arc;

use student_activity_sdk::StudentActivityClientV1;
use tracing::{debug, info};

use crate::config::{ConfigError, StudentActivityConfig};
use crate::domain::local_client::StudentActivityLocalClient;
use crate::domain::service::{Directory, Service, ServiceConfig};
use crate::infra::storage::{DirectorySnapshot, InMemoryDirectory};

/// Composition root: wires the services over a [`Directory`] and exposes
/// them through [`StudentActivityClientV1`].
#[derive(Clone)]
pub struct StudentActivity {
    service: Arc<Service>,
    client: Arc<dyn StudentActivityClientV1>,
}

impl StudentActivity {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the configuration fails validation.
    pub fn new(directory: &Directory, cfg: &StudentActivityConfig) -> Result<Self, ConfigError> {
        info!("Initializing student_activity module");
        let service_config = ServiceConfig::from_config(cfg)?;
        debug!(
            "Loaded student_activity config: default_page_size={}, max_page_size={}, timed_posts_enabled={}",
            service_config.default_page_size,
            service_config.max_page_size,
            service_config.timed_posts_enabled
        );

        let service = Arc::new(Service::new(directory, &service_config));
        let client: Arc<dyn StudentActivityClientV1> =
            Arc::new(StudentActivityLocalClient::new(service.clone()));
        info!("StudentActivity client ready as dyn StudentActivityClientV1");
        Ok(Self { service, client })
    }

    /// Serve every collaborator from one in-memory snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the configuration fails validation.
    pub fn from_snapshot(
        snapshot: DirectorySnapshot,
        cfg: &StudentActivityConfig,
    ) -> Result<Self, ConfigError> {
        debug!(
            users = snapshot.users.len(),
            courses = snapshot.courses.len(),
            posts = snapshot.posts.len(),
            "Loading in-memory directory"
        );
        let backend = Arc::new(InMemoryDirectory::new(snapshot));
        Self::new(&Directory::from_backend(backend), cfg)
    }

    #[must_use]
    pub fn client(&self) -> Arc<dyn StudentActivityClientV1> {
        self.client.clone()
    }

    #[must_use]
    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }
}
