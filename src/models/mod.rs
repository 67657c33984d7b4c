pub mod task;
pub mod user;

pub use task::{Task, TaskInput, TaskPatch, TaskQuery};
pub use user::{User, UserInput, UserPatch};

use crate::error::AppError;
use serde_json::{Map, Value};

/// Rejects a patch body containing any key outside `allowed`.
///
/// The check runs before anything is deserialized or persisted, so a patch
/// naming a forbidden field (e.g. `owner` on a task, `tokens` on a user) is
/// refused atomically with no partial apply.
pub fn ensure_allowed_keys(body: &Map<String, Value>, allowed: &[&str]) -> Result<(), AppError> {
    if body.keys().any(|key| !allowed.contains(&key.as_str())) {
        return Err(AppError::ValidationError("Invalid Update".into()));
    }
    Ok(())
}
