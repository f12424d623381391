//! Application state for metadata service.

use std::sync::Arc;

use common::config::AppConfig;
use crate::service::{MetadataService, MetadataServiceTrait};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub service: Arc<dyn MetadataServiceTrait>,
}

impl AppState {
    /// Creates a new application state backed by PostgreSQL.
    pub fn new(config: AppConfig) -> Self {
        let service = Arc::new(MetadataService::new(&config));
        Self::with_service(config, service)
    }

    /// Creates an application state around an existing service.
    pub fn with_service(config: AppConfig, service: Arc<dyn MetadataServiceTrait>) -> Self {
        Self { config, service }
    }
}
