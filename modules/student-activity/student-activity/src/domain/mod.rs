pub mod error;
pub mod local_client;
pub mod service;

pub use error::DomainError;
pub use service::{Directory, Service, ServiceConfig};
