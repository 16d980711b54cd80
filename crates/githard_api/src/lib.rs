//! Request handlers for the project service.
//!
//! # Responsibility
//! - Parse JSON request bodies and reject missing/malformed input with 400.
//! - Delegate to `ProjectService` and shape JSON response envelopes.
//! - Map each failure kind to a distinct status code.
//!
//! # Invariants
//! - Handlers never panic; every outcome is an `ApiResponse`.
//! - Storage failures surface as 500 (503 for lock timeouts) with a generic
//!   message; details go to the log only.
//!
//! Transport (routing, sockets, CORS) is left to whatever server embeds
//! these handlers.

use githard_core::{
    core_version, service_name, CreateProjectRequest, Project, ProjectRepository, ProjectService,
    ProjectServiceError, RepoError, RepoResult, SqliteProjectRepository,
};
use log::{error, warn};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

const MSG_PROJECT_ADDED: &str = "Project added successfully";
const MSG_PROJECT_JOINED: &str = "Project joined successfully";
const MSG_USAGE_UPDATED: &str = "Hardware usage updated successfully";
const MSG_PROJECT_MISSING: &str = "Project does not exist";
const MSG_PROJECT_TAKEN: &str = "ProjectId already taken";
const MSG_ALREADY_JOINED: &str = "Project already joined";
const MSG_STORAGE_FAILURE: &str = "Internal storage error";
const MSG_STORE_BUSY: &str = "Project store is busy, retry later";

/// Status code plus JSON body returned by every handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    fn success(message: &str) -> Self {
        Self::new(200, json!({ "status": "success", "message": message }))
    }

    fn failure(status: u16, message: impl Into<String>) -> Self {
        Self::new(
            status,
            json!({ "status": "failure", "message": message.into() }),
        )
    }

    /// Health response for a store that could not even be opened.
    pub fn unhealthy(error: impl std::fmt::Display) -> Self {
        Self::new(500, json!({ "ok": false, "error": error.to_string() }))
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Handler set bound to one project service instance.
pub struct ProjectApi<R: ProjectRepository> {
    service: ProjectService<R>,
}

impl<'conn> ProjectApi<SqliteProjectRepository<'conn>> {
    /// Builds handlers over a migrated SQLite connection.
    pub fn from_connection(conn: &'conn Connection) -> RepoResult<Self> {
        let repo = SqliteProjectRepository::try_new(conn)?;
        Ok(Self::new(ProjectService::new(repo)))
    }
}

impl<R: ProjectRepository> ProjectApi<R> {
    pub fn new(service: ProjectService<R>) -> Self {
        Self { service }
    }

    /// `GET /`
    pub fn root(&self) -> ApiResponse {
        ApiResponse::new(
            200,
            json!({ "message": service_name(), "version": core_version() }),
        )
    }

    /// `GET /api/health`
    pub fn health(&self) -> ApiResponse {
        match self.service.health() {
            Ok(()) => ApiResponse::new(200, json!({ "ok": true })),
            Err(err) => ApiResponse::unhealthy(err),
        }
    }

    /// `POST /create_project`
    ///
    /// Body: `{projectName, projectId, description?, ownerUserId?|userId?}`.
    pub fn create_project(&self, body: &Value) -> ApiResponse {
        let request = match parse_create_request(body) {
            Ok(request) => request,
            Err(response) => return response,
        };

        match self.service.create_project_with_owner(&request) {
            Ok(project) => {
                let mut response = ApiResponse::success(MSG_PROJECT_ADDED);
                response.body["project"] = project_representation(&project);
                response
            }
            Err(ProjectServiceError::AlreadyExists(_)) => {
                ApiResponse::failure(409, MSG_PROJECT_TAKEN)
            }
            Err(err) => service_failure("create_project", err),
        }
    }

    /// `GET /get_project_info?projectId=...`
    pub fn get_project_info(&self, project_id: Option<&str>) -> ApiResponse {
        let Some(project_id) = project_id.filter(|id| !id.is_empty()) else {
            return ApiResponse::new(400, json!({ "error": "Missing 'projectId' in request" }));
        };

        match self.service.get_project(project_id) {
            Ok(project) => ApiResponse::new(200, project_representation(&project)),
            Err(ProjectServiceError::NotFound(_)) => {
                ApiResponse::new(404, json!({ "message": MSG_PROJECT_MISSING }))
            }
            Err(err) => service_failure("get_project_info", err),
        }
    }

    /// `POST /join_project`
    ///
    /// Body: `{projectId, userId}`.
    pub fn join_project(&self, body: &Value) -> ApiResponse {
        let (project_id, user_id) = match parse_join_request(body) {
            Ok(parsed) => parsed,
            Err(response) => return response,
        };

        match self.service.add_member(&project_id, &user_id) {
            Ok(_) => ApiResponse::success(MSG_PROJECT_JOINED),
            Err(ProjectServiceError::NotFound(_)) => {
                ApiResponse::failure(404, MSG_PROJECT_MISSING)
            }
            Err(ProjectServiceError::AlreadyMember { .. }) => {
                ApiResponse::failure(409, MSG_ALREADY_JOINED)
            }
            Err(err) => service_failure("join_project", err),
        }
    }

    /// `POST /update_hw_usage`
    ///
    /// Body: `{projectId, hwSetName, qty}`; `qty` is a signed integer or an
    /// integer-valued string. Business-rule failures are reported as 400.
    pub fn update_hw_usage(&self, body: &Value) -> ApiResponse {
        let (project_id, hw_set_name, qty) = match parse_usage_request(body) {
            Ok(parsed) => parsed,
            Err(response) => return response,
        };

        match self.service.update_hw_usage(&project_id, &hw_set_name, qty) {
            Ok(quantity) => {
                let mut response = ApiResponse::success(MSG_USAGE_UPDATED);
                response.body["quantity"] = json!(quantity);
                response
            }
            Err(ProjectServiceError::NotFound(_)) => {
                ApiResponse::failure(400, MSG_PROJECT_MISSING)
            }
            Err(ProjectServiceError::InvalidQuantity(err)) => ApiResponse::failure(
                400,
                format!(
                    "Invalid quantity: {} has {} checked out, cannot apply {}",
                    err.hw_set_name, err.current, err.delta
                ),
            ),
            Err(err) => service_failure("update_hw_usage", err),
        }
    }
}

/// JSON shape returned by the fetch endpoint and embedded on create.
pub fn project_representation(project: &Project) -> Value {
    json!({
        "projectId": project.project_id,
        "projectName": project.project_name,
        "description": project.description,
        "users": project.users,
        "hwSets": project.hw_sets,
    })
}

fn parse_create_request(body: &Value) -> Result<CreateProjectRequest, ApiResponse> {
    const REQUIRED: &str = "projectName and projectId are required";
    let fields = body_object(body)?;

    let project_name = optional_string(fields, "projectName")?;
    let project_id = optional_string(fields, "projectId")?;
    let (Some(project_name), Some(project_id)) = (project_name, project_id) else {
        return Err(ApiResponse::failure(400, REQUIRED));
    };

    let description = optional_string(fields, "description")?;
    let owner_user_id = match optional_user_id(fields, "ownerUserId")? {
        Some(owner) => Some(owner),
        None => optional_user_id(fields, "userId")?,
    };

    Ok(CreateProjectRequest {
        project_name,
        project_id,
        description,
        owner_user_id,
    })
}

fn parse_join_request(body: &Value) -> Result<(String, String), ApiResponse> {
    const REQUIRED: &str = "projectId and userId are required";
    let fields = body_object(body)?;

    let project_id = optional_string(fields, "projectId")?;
    let user_id = optional_user_id(fields, "userId")?;
    match (project_id, user_id) {
        (Some(project_id), Some(user_id)) => Ok((project_id, user_id)),
        _ => Err(ApiResponse::failure(400, REQUIRED)),
    }
}

fn parse_usage_request(body: &Value) -> Result<(String, String, i64), ApiResponse> {
    const REQUIRED: &str = "projectId, hwSetName, and qty are required";
    let fields = body_object(body)?;

    let project_id = optional_string(fields, "projectId")?;
    let hw_set_name = optional_string(fields, "hwSetName")?;
    let qty = fields.get("qty").filter(|value| !value.is_null());
    let (Some(project_id), Some(hw_set_name), Some(qty)) = (project_id, hw_set_name, qty) else {
        return Err(ApiResponse::failure(400, REQUIRED));
    };

    let qty = parse_qty(qty).ok_or_else(|| ApiResponse::failure(400, "qty must be an integer"))?;
    Ok((project_id, hw_set_name, qty))
}

/// Absent bodies are treated as `{}`.
fn body_object(body: &Value) -> Result<&Map<String, Value>, ApiResponse> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
    match body {
        Value::Object(fields) => Ok(fields),
        Value::Null => Ok(EMPTY.get_or_init(Map::new)),
        _ => Err(ApiResponse::failure(400, "request body must be a JSON object")),
    }
}

/// Missing, `null` and `""` all read as absent.
fn optional_string(
    fields: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ApiResponse> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) if value.is_empty() => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(ApiResponse::failure(400, format!("{key} must be a string"))),
    }
}

/// User ids may arrive as strings or numbers; numbers are stringified.
fn optional_user_id(
    fields: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ApiResponse> {
    match fields.get(key) {
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        _ => optional_string(fields, key),
    }
}

fn parse_qty(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn service_failure(handler: &str, err: ProjectServiceError) -> ApiResponse {
    match err {
        ProjectServiceError::Validation(err) => ApiResponse::failure(400, err.to_string()),
        ProjectServiceError::NotFound(_) => ApiResponse::failure(404, MSG_PROJECT_MISSING),
        ProjectServiceError::AlreadyExists(_) => ApiResponse::failure(409, MSG_PROJECT_TAKEN),
        ProjectServiceError::AlreadyMember { .. } => ApiResponse::failure(409, MSG_ALREADY_JOINED),
        ProjectServiceError::InvalidQuantity(err) => ApiResponse::failure(400, err.to_string()),
        ProjectServiceError::Repo(RepoError::Db(err)) if err.is_busy() => {
            warn!("event=api_request module=api handler={handler} status=busy error={err}");
            ApiResponse::failure(503, MSG_STORE_BUSY)
        }
        ProjectServiceError::Repo(err) => {
            error!("event=api_request module=api handler={handler} status=error error={err}");
            ApiResponse::failure(500, MSG_STORAGE_FAILURE)
        }
    }
}
