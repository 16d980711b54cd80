//! Project domain model.
//!
//! # Responsibility
//! - Define the project document stored in the collection.
//! - Provide the in-memory membership and hardware-usage transitions.
//!
//! # Invariants
//! - `project_id` and `project_name` are non-empty.
//! - `users` holds no duplicates and keeps join order.
//! - Every `hw_sets` value is positive; a quantity of zero is represented by
//!   the absence of the key.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller-chosen primary key of a project document.
pub type ProjectId = String;

/// Opaque user identifier stored in a project's member list.
pub type UserId = String;

/// Canonical project document.
///
/// Serialized with the camelCase field names used by the collection
/// (`projectId`, `projectName`, `description`, `users`, `hwSets`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_id: ProjectId,
    pub project_name: String,
    /// Older documents may omit this or store `null`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Members in join order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<UserId>,
    /// Hardware set name to checked-out quantity.
    #[serde(default, deserialize_with = "null_as_default")]
    pub hw_sets: BTreeMap<String, u64>,
}

/// Invariant violations detected on a project document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectValidationError {
    EmptyProjectId,
    EmptyProjectName,
    EmptyHwSetName,
    EmptyUserId,
    DuplicateMember(UserId),
    ZeroQuantity(String),
}

impl Display for ProjectValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyProjectId => write!(f, "projectId must not be empty"),
            Self::EmptyProjectName => write!(f, "projectName must not be empty"),
            Self::EmptyHwSetName => write!(f, "hwSetName must not be empty"),
            Self::EmptyUserId => write!(f, "userId must not be empty"),
            Self::DuplicateMember(user_id) => {
                write!(f, "user `{user_id}` appears more than once in users")
            }
            Self::ZeroQuantity(name) => {
                write!(f, "hardware set `{name}` is stored with quantity zero")
            }
        }
    }
}

impl Error for ProjectValidationError {}

/// Rejected hardware-usage delta.
///
/// Raised when applying `delta` to `current` would leave the quantity below
/// zero or outside the representable range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidQuantity {
    pub hw_set_name: String,
    pub current: u64,
    pub delta: i64,
}

impl Display for InvalidQuantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid quantity for `{}`: {} checked out, delta {}",
            self.hw_set_name, self.current, self.delta
        )
    }
}

impl Error for InvalidQuantity {}

impl Project {
    /// Creates a fresh project with no members and no hardware usage.
    pub fn new(
        project_id: impl Into<ProjectId>,
        project_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            project_name: project_name.into(),
            description: description.into(),
            users: Vec::new(),
            hw_sets: BTreeMap::new(),
        }
    }

    /// Checks every document invariant.
    pub fn validate(&self) -> Result<(), ProjectValidationError> {
        if self.project_id.trim().is_empty() {
            return Err(ProjectValidationError::EmptyProjectId);
        }
        if self.project_name.trim().is_empty() {
            return Err(ProjectValidationError::EmptyProjectName);
        }

        for (index, user_id) in self.users.iter().enumerate() {
            if self.users[..index].contains(user_id) {
                return Err(ProjectValidationError::DuplicateMember(user_id.clone()));
            }
        }

        for (name, quantity) in &self.hw_sets {
            if name.is_empty() {
                return Err(ProjectValidationError::EmptyHwSetName);
            }
            if *quantity == 0 {
                return Err(ProjectValidationError::ZeroQuantity(name.clone()));
            }
        }

        Ok(())
    }

    /// Returns whether `user_id` is already a member (exact match).
    pub fn is_member(&self, user_id: &str) -> bool {
        self.users.iter().any(|member| member == user_id)
    }

    /// Appends `user_id` to the member list.
    ///
    /// Returns `false` and leaves the list untouched when already present.
    pub fn add_member(&mut self, user_id: impl Into<UserId>) -> bool {
        let user_id = user_id.into();
        if self.is_member(&user_id) {
            return false;
        }
        self.users.push(user_id);
        true
    }

    /// Currently checked-out quantity; absent keys count as zero.
    pub fn hw_quantity(&self, hw_set_name: &str) -> u64 {
        self.hw_sets.get(hw_set_name).copied().unwrap_or(0)
    }

    /// Applies a signed usage delta to one hardware set.
    ///
    /// Returns the resulting quantity. A result of zero removes the key.
    /// On error the document is left unchanged.
    pub fn apply_hw_delta(
        &mut self,
        hw_set_name: &str,
        delta: i64,
    ) -> Result<u64, InvalidQuantity> {
        let current = self.hw_quantity(hw_set_name);
        let updated = if delta < 0 {
            current.checked_sub(delta.unsigned_abs())
        } else {
            current.checked_add(delta.unsigned_abs())
        };

        let Some(updated) = updated else {
            return Err(InvalidQuantity {
                hw_set_name: hw_set_name.to_string(),
                current,
                delta,
            });
        };

        if updated == 0 {
            self.hw_sets.remove(hw_set_name);
        } else {
            self.hw_sets.insert(hw_set_name.to_string(), updated);
        }
        Ok(updated)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::{InvalidQuantity, Project, ProjectValidationError};

    #[test]
    fn new_project_starts_empty() {
        let project = Project::new("p1", "Atlas", "");
        assert!(project.users.is_empty());
        assert!(project.hw_sets.is_empty());
        assert_eq!(project.validate(), Ok(()));
    }

    #[test]
    fn add_member_keeps_join_order_and_rejects_duplicates() {
        let mut project = Project::new("p1", "Atlas", "");
        assert!(project.add_member("u2"));
        assert!(project.add_member("u1"));
        assert!(!project.add_member("u2"));
        assert_eq!(project.users, vec!["u2".to_string(), "u1".to_string()]);
    }

    #[test]
    fn apply_hw_delta_prunes_zero_and_rejects_negative() {
        let mut project = Project::new("p1", "Atlas", "");
        assert_eq!(project.apply_hw_delta("A", 2), Ok(2));

        let err = project.apply_hw_delta("A", -5).unwrap_err();
        assert_eq!(
            err,
            InvalidQuantity {
                hw_set_name: "A".to_string(),
                current: 2,
                delta: -5,
            }
        );
        assert_eq!(project.hw_quantity("A"), 2);

        assert_eq!(project.apply_hw_delta("A", -2), Ok(0));
        assert!(!project.hw_sets.contains_key("A"));
    }

    #[test]
    fn apply_hw_delta_handles_extreme_values() {
        let mut project = Project::new("p1", "Atlas", "");
        assert!(project.apply_hw_delta("A", i64::MIN).is_err());
        assert_eq!(project.apply_hw_delta("A", i64::MAX), Ok(i64::MAX as u64));
        assert_eq!(project.apply_hw_delta("A", 0), Ok(i64::MAX as u64));
    }

    #[test]
    fn validate_reports_duplicate_members_and_zero_quantities() {
        let mut project = Project::new("p1", "Atlas", "");
        project.users = vec!["u1".to_string(), "u1".to_string()];
        assert_eq!(
            project.validate(),
            Err(ProjectValidationError::DuplicateMember("u1".to_string()))
        );

        project.users.pop();
        project.hw_sets.insert("A".to_string(), 0);
        assert_eq!(
            project.validate(),
            Err(ProjectValidationError::ZeroQuantity("A".to_string()))
        );
    }

    #[test]
    fn deserializes_older_documents_with_defaults() {
        let project: Project = serde_json::from_str(
            r#"{"projectId":"p1","projectName":"Atlas","description":null}"#,
        )
        .expect("legacy document should parse");
        assert_eq!(project.description, "");
        assert!(project.users.is_empty());
        assert!(project.hw_sets.is_empty());
    }

    #[test]
    fn serializes_with_collection_field_names() {
        let mut project = Project::new("p1", "Atlas", "x");
        project.hw_sets.insert("HWSet1".to_string(), 2);
        let value = serde_json::to_value(&project).expect("project should serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "projectId": "p1",
                "projectName": "Atlas",
                "description": "x",
                "users": [],
                "hwSets": {"HWSet1": 2}
            })
        );
    }
}
