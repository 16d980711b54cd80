//! Core domain logic for the GitHard project service.
//! This crate is the single source of truth for project invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, ServiceConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::project::{InvalidQuantity, Project, ProjectId, ProjectValidationError, UserId};
pub use repo::project_repo::{ProjectRepository, RepoError, RepoResult, SqliteProjectRepository};
pub use service::project_service::{
    CreateProjectRequest, ProjectService, ProjectServiceError, ProjectServiceResult,
};

/// Human-readable service name reported by the info endpoint.
pub fn service_name() -> &'static str {
    "Project Service API"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, service_name};

    #[test]
    fn service_name_is_stable() {
        assert_eq!(service_name(), "Project Service API");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
