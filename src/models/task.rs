use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Fields a `PATCH /tasks/{id}` body may contain.
pub const TASK_PATCH_FIELDS: &[&str] = &["description", "completed"];

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    /// What needs doing.
    pub description: String,
    /// Whether the task is done. Defaults to false.
    pub completed: bool,
    /// Identifier of the user who owns the task. Fixed at creation.
    pub owner: i32,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the task.
    pub updated_at: DateTime<Utc>,
}

/// Input structure for creating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    #[validate(length(min = 1, message = "Description must not be empty"))]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

/// Fields of a task patch, after the allow-list key check has passed.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskPatch {
    #[validate(length(min = 1, message = "Description must not be empty"))]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.completed.is_none()
    }
}

/// Query parameters for `GET /tasks`.
///
/// `sortBy` takes the form `field:asc` or `field:desc`; a missing direction
/// (or anything other than `desc`) means ascending.
#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub completed: Option<bool>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

impl TaskQuery {
    /// Resolves `sortBy` into an `ORDER BY` column and direction.
    ///
    /// Sort columns are interpolated into SQL, so the field name is mapped
    /// through an allow-list; anything else is rejected. Defaults to
    /// insertion order, which keeps limit/skip deterministic.
    pub fn order_clause(&self) -> Result<(&'static str, &'static str), AppError> {
        let raw = match &self.sort_by {
            Some(raw) => raw.as_str(),
            None => return Ok(("created_at", "ASC")),
        };
        let (field, direction) = raw.split_once(':').unwrap_or((raw, "asc"));
        let column = match field {
            "createdAt" => "created_at",
            "updatedAt" => "updated_at",
            "description" => "description",
            "completed" => "completed",
            _ => {
                return Err(AppError::ValidationError(format!(
                    "Cannot sort by '{}'",
                    field
                )))
            }
        };
        let direction = if direction == "desc" { "DESC" } else { "ASC" };
        Ok((column, direction))
    }
}
