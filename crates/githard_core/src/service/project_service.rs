//! Project use-case service.
//!
//! # Responsibility
//! - Provide the create/get/join/usage entry points for request handlers.
//! - Validate caller input before touching the repository.
//! - Emit one metadata-only log event per operation.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Log events carry project ids and error codes, never user ids or
//!   descriptions.

use crate::model::project::{InvalidQuantity, Project, ProjectId, ProjectValidationError, UserId};
use crate::repo::project_repo::{ProjectRepository, RepoError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Service error for project use-cases.
#[derive(Debug)]
pub enum ProjectServiceError {
    /// Missing or malformed input, rejected before the store is touched.
    Validation(ProjectValidationError),
    NotFound(ProjectId),
    AlreadyExists(ProjectId),
    AlreadyMember {
        project_id: ProjectId,
        user_id: UserId,
    },
    InvalidQuantity(InvalidQuantity),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl ProjectServiceError {
    /// Stable short code used in log events and response mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::AlreadyMember { .. } => "already_member",
            Self::InvalidQuantity(_) => "invalid_quantity",
            Self::Repo(_) => "storage",
        }
    }
}

impl Display for ProjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "project not found: {id}"),
            Self::AlreadyExists(id) => write!(f, "projectId already taken: {id}"),
            Self::AlreadyMember {
                project_id,
                user_id,
            } => write!(f, "user `{user_id}` already joined project {project_id}"),
            Self::InvalidQuantity(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::InvalidQuantity(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProjectValidationError> for ProjectServiceError {
    fn from(value: ProjectValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ProjectServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::AlreadyExists(id) => Self::AlreadyExists(id),
            RepoError::AlreadyMember {
                project_id,
                user_id,
            } => Self::AlreadyMember {
                project_id,
                user_id,
            },
            RepoError::InvalidQuantity(err) => Self::InvalidQuantity(err),
            other => Self::Repo(other),
        }
    }
}

pub type ProjectServiceResult<T> = Result<T, ProjectServiceError>;

/// Input for project creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateProjectRequest {
    pub project_name: String,
    pub project_id: ProjectId,
    /// `None` stores an empty description.
    pub description: Option<String>,
    /// Creator joined as the first member when present.
    pub owner_user_id: Option<UserId>,
}

/// Project service facade over repository implementations.
pub struct ProjectService<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> ProjectService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a project with no members and no hardware usage.
    pub fn create_project(
        &self,
        project_name: &str,
        project_id: &str,
        description: Option<&str>,
    ) -> ProjectServiceResult<Project> {
        self.create_project_with_owner(&CreateProjectRequest {
            project_name: project_name.to_string(),
            project_id: project_id.to_string(),
            description: description.map(str::to_string),
            owner_user_id: None,
        })
    }

    /// Creates a project and, when an owner is given, joins them first.
    ///
    /// # Contract
    /// - `project_name` and `project_id` must be non-blank.
    /// - Fails with `AlreadyExists` without touching the stored document
    ///   when the id is taken.
    pub fn create_project_with_owner(
        &self,
        request: &CreateProjectRequest,
    ) -> ProjectServiceResult<Project> {
        let started_at = Instant::now();
        let result = (|| -> ProjectServiceResult<Project> {
            require_non_blank(&request.project_name, ProjectValidationError::EmptyProjectName)?;
            require_non_blank(&request.project_id, ProjectValidationError::EmptyProjectId)?;
            let owner = match request.owner_user_id.as_deref() {
                Some(owner) => {
                    require_non_blank(owner, ProjectValidationError::EmptyUserId)?;
                    Some(owner)
                }
                None => None,
            };

            let project = Project::new(
                request.project_id.as_str(),
                request.project_name.as_str(),
                request.description.clone().unwrap_or_default(),
            );
            Ok(self.repo.create_project(&project, owner)?)
        })();
        log_outcome("project_create", &request.project_id, started_at, &result);
        result
    }

    /// Fetches one project with optional fields defaulted.
    pub fn get_project(&self, project_id: &str) -> ProjectServiceResult<Project> {
        let started_at = Instant::now();
        let result = (|| -> ProjectServiceResult<Project> {
            require_non_blank(project_id, ProjectValidationError::EmptyProjectId)?;
            self.repo
                .get_project(project_id)?
                .ok_or_else(|| ProjectServiceError::NotFound(project_id.to_string()))
        })();
        log_outcome("project_get", project_id, started_at, &result);
        result
    }

    /// Joins `user_id` to the project, preserving join order.
    pub fn add_member(&self, project_id: &str, user_id: &str) -> ProjectServiceResult<Project> {
        let started_at = Instant::now();
        let result = (|| -> ProjectServiceResult<Project> {
            require_non_blank(project_id, ProjectValidationError::EmptyProjectId)?;
            require_non_blank(user_id, ProjectValidationError::EmptyUserId)?;
            Ok(self.repo.add_member(project_id, user_id)?)
        })();
        log_outcome("project_join", project_id, started_at, &result);
        result
    }

    /// Applies a signed checkout (`delta > 0`) or checkin (`delta < 0`).
    ///
    /// Returns the resulting quantity; zero means the entry was pruned.
    pub fn update_hw_usage(
        &self,
        project_id: &str,
        hw_set_name: &str,
        delta: i64,
    ) -> ProjectServiceResult<u64> {
        let started_at = Instant::now();
        let result = (|| -> ProjectServiceResult<u64> {
            require_non_blank(project_id, ProjectValidationError::EmptyProjectId)?;
            require_non_blank(hw_set_name, ProjectValidationError::EmptyHwSetName)?;
            Ok(self.repo.update_hw_usage(project_id, hw_set_name, delta)?)
        })();
        log_outcome("project_hw_usage", project_id, started_at, &result);
        result
    }

    /// Checks that the store answers a trivial query.
    pub fn health(&self) -> ProjectServiceResult<()> {
        self.repo.ping().map_err(|err| {
            warn!("event=health_check module=service status=error error={err}");
            ProjectServiceError::from(err)
        })
    }
}

fn require_non_blank(
    value: &str,
    error: ProjectValidationError,
) -> Result<(), ProjectValidationError> {
    if value.trim().is_empty() {
        return Err(error);
    }
    Ok(())
}

fn log_outcome<T>(
    event: &str,
    project_id: &str,
    started_at: Instant,
    result: &ProjectServiceResult<T>,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!(
            "event={event} module=service status=ok project_id={project_id} duration_ms={duration_ms}"
        ),
        Err(ProjectServiceError::Repo(err)) => warn!(
            "event={event} module=service status=error project_id={project_id} duration_ms={duration_ms} error_code=storage error={err}"
        ),
        Err(err) => info!(
            "event={event} module=service status=rejected project_id={project_id} duration_ms={duration_ms} error_code={}",
            err.code()
        ),
    }
}
