//! Project repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide find/insert/update APIs over the `projects` document collection.
//! - Keep SQL and JSON document encoding inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Project::validate()` before SQL mutations.
//! - Read paths reject invalid persisted documents instead of masking them.
//! - Membership and usage updates hold the write lock from read to write, so
//!   concurrent callers on separate connections cannot interleave.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::project::{InvalidQuantity, Project, ProjectId, ProjectValidationError, UserId};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for project persistence operations.
#[derive(Debug)]
pub enum RepoError {
    /// Input or document violates a project invariant.
    Validation(ProjectValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    NotFound(ProjectId),
    AlreadyExists(ProjectId),
    AlreadyMember {
        project_id: ProjectId,
        user_id: UserId,
    },
    /// Usage delta would drive a quantity below zero.
    InvalidQuantity(InvalidQuantity),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted document cannot be decoded into a valid project.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "project not found: {id}"),
            Self::AlreadyExists(id) => write!(f, "projectId already taken: {id}"),
            Self::AlreadyMember {
                project_id,
                user_id,
            } => write!(f, "user `{user_id}` already joined project {project_id}"),
            Self::InvalidQuantity(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "project repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted project data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidQuantity(err) => Some(err),
            Self::NotFound(_)
            | Self::AlreadyExists(_)
            | Self::AlreadyMember { .. }
            | Self::UninitializedConnection { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<ProjectValidationError> for RepoError {
    fn from(value: ProjectValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<InvalidQuantity> for RepoError {
    fn from(value: InvalidQuantity) -> Self {
        Self::InvalidQuantity(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the project collection.
pub trait ProjectRepository {
    /// Inserts a new project document, optionally joining `owner` as the
    /// first member in the same transaction.
    fn create_project(&self, project: &Project, owner: Option<&str>) -> RepoResult<Project>;
    /// Finds one project by id.
    fn get_project(&self, project_id: &str) -> RepoResult<Option<Project>>;
    /// Appends `user_id` to the project's members if absent.
    fn add_member(&self, project_id: &str, user_id: &str) -> RepoResult<Project>;
    /// Applies a signed delta to one hardware set and returns the new quantity.
    fn update_hw_usage(&self, project_id: &str, hw_set_name: &str, delta: i64)
        -> RepoResult<u64>;
    /// Round-trips a trivial statement on the underlying connection.
    fn ping(&self) -> RepoResult<()>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Wraps a connection after checking it has been migrated.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &Project, owner: Option<&str>) -> RepoResult<Project> {
        let mut document = project.clone();
        if let Some(owner) = owner {
            document.add_member(owner);
        }
        document.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if project_exists(&tx, &document.project_id)? {
            return Err(RepoError::AlreadyExists(document.project_id));
        }

        tx.execute(
            "INSERT INTO projects (project_id, document) VALUES (?1, ?2);",
            params![document.project_id.as_str(), encode_document(&document)?],
        )?;
        tx.commit()?;

        Ok(document)
    }

    fn get_project(&self, project_id: &str) -> RepoResult<Option<Project>> {
        load_project(self.conn, project_id)
    }

    fn add_member(&self, project_id: &str, user_id: &str) -> RepoResult<Project> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut project = load_project(&tx, project_id)?
            .ok_or_else(|| RepoError::NotFound(project_id.to_string()))?;

        if !project.add_member(user_id) {
            return Err(RepoError::AlreadyMember {
                project_id: project_id.to_string(),
                user_id: user_id.to_string(),
            });
        }

        store_project(&tx, &project)?;
        tx.commit()?;
        Ok(project)
    }

    fn update_hw_usage(
        &self,
        project_id: &str,
        hw_set_name: &str,
        delta: i64,
    ) -> RepoResult<u64> {
        if hw_set_name.is_empty() {
            return Err(RepoError::Validation(ProjectValidationError::EmptyHwSetName));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut project = load_project(&tx, project_id)?
            .ok_or_else(|| RepoError::NotFound(project_id.to_string()))?;

        let quantity = project.apply_hw_delta(hw_set_name, delta)?;

        store_project(&tx, &project)?;
        tx.commit()?;
        Ok(quantity)
    }

    fn ping(&self) -> RepoResult<()> {
        let _: i64 = self.conn.query_row("SELECT 1;", [], |row| row.get(0))?;
        Ok(())
    }
}

fn project_exists(conn: &Connection, project_id: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE project_id = ?1);",
        [project_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_project(conn: &Connection, project_id: &str) -> RepoResult<Option<Project>> {
    let document: Option<String> = conn
        .query_row(
            "SELECT document FROM projects WHERE project_id = ?1;",
            [project_id],
            |row| row.get(0),
        )
        .optional()?;

    document
        .map(|text| decode_document(project_id, &text))
        .transpose()
}

fn store_project(conn: &Connection, project: &Project) -> RepoResult<()> {
    project.validate()?;

    let changed = conn.execute(
        "UPDATE projects
         SET
            document = ?2,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE project_id = ?1;",
        params![project.project_id.as_str(), encode_document(project)?],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound(project.project_id.clone()));
    }

    Ok(())
}

fn encode_document(project: &Project) -> RepoResult<String> {
    serde_json::to_string(project)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode project document: {err}")))
}

fn decode_document(project_id: &str, text: &str) -> RepoResult<Project> {
    let project: Project = serde_json::from_str(text).map_err(|err| {
        RepoError::InvalidData(format!("malformed document for project `{project_id}`: {err}"))
    })?;

    if project.project_id != project_id {
        return Err(RepoError::InvalidData(format!(
            "document key `{project_id}` holds projectId `{}`",
            project.project_id
        )));
    }

    project.validate().map_err(|err| {
        RepoError::InvalidData(format!("document for project `{project_id}`: {err}"))
    })?;

    Ok(project)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
