use crate::{
    auth::AuthedUser,
    error::AppError,
    models::task::TASK_PATCH_FIELDS,
    models::{ensure_allowed_keys, Task, TaskInput, TaskPatch, TaskQuery},
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Creates a new task owned by the caller.
///
/// The owner is always the authenticated user; it cannot be supplied in the
/// body and never changes afterwards.
///
/// ## Responses:
/// - `201 Created`: the stored `Task` as JSON.
/// - `400 Bad Request`: empty description.
/// - `401 Unauthorized`: missing or invalid token.
#[post("/tasks")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    auth: AuthedUser,
    input: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    input.validate()?;

    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (id, description, completed, owner) VALUES ($1, $2, $3, $4) \
         RETURNING id, description, completed, owner, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(&input.description)
    .bind(input.completed)
    .bind(auth.user.id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(task))
}

/// Lists the caller's tasks with filter, sort, and pagination.
///
/// Every query is scoped to the authenticated owner; there is no way to
/// reach another user's tasks through this endpoint.
///
/// ## Query Parameters:
/// - `completed` (optional): keep only tasks with this completion state.
/// - `sortBy` (optional): `field:asc|desc` over
///   createdAt/updatedAt/description/completed. Default is insertion order.
/// - `limit` / `skip` (optional): pagination, applied after filter and sort.
#[get("/tasks")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    auth: AuthedUser,
    query_params: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let (order_column, order_direction) = query_params.order_clause()?;

    // Base query selects only the owner's rows; the remaining clauses are
    // appended conditionally with matching positional binds.
    let mut sql = String::from(
        "SELECT id, description, completed, owner, created_at, updated_at \
         FROM tasks WHERE owner = $1",
    );
    let mut param_count = 2;

    if query_params.completed.is_some() {
        sql.push_str(&format!(" AND completed = ${}", param_count));
        param_count += 1;
    }

    // The order column comes from an allow-list, never from raw input.
    sql.push_str(&format!(" ORDER BY {} {}", order_column, order_direction));

    if query_params.limit.is_some() {
        sql.push_str(&format!(" LIMIT ${}", param_count));
        param_count += 1;
    }
    if query_params.skip.is_some() {
        sql.push_str(&format!(" OFFSET ${}", param_count));
    }

    let mut query_builder = sqlx::query_as::<_, Task>(&sql);

    query_builder = query_builder.bind(auth.user.id);
    if let Some(completed) = query_params.completed {
        query_builder = query_builder.bind(completed);
    }
    if let Some(limit) = query_params.limit {
        query_builder = query_builder.bind(limit);
    }
    if let Some(skip) = query_params.skip {
        query_builder = query_builder.bind(skip);
    }

    let tasks = query_builder.fetch_all(&**pool).await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Retrieves one of the caller's tasks by id.
///
/// A task owned by someone else answers exactly like a task that does not
/// exist, so this endpoint leaks nothing about other users' data.
#[get("/tasks/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    auth: AuthedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = sqlx::query_as::<_, Task>(
        "SELECT id, description, completed, owner, created_at, updated_at \
         FROM tasks WHERE id = $1 AND owner = $2",
    )
    .bind(task_id.into_inner())
    .bind(auth.user.id)
    .fetch_optional(&**pool)
    .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Updates one of the caller's tasks.
///
/// The body may only name `description` and `completed`; any other key
/// (including `owner`) fails the whole patch with "Invalid Update" before
/// anything is touched.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `400 Bad Request`: disallowed key or invalid field value.
/// - `404 Not Found`: no such task under this owner.
#[patch("/tasks/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    auth: AuthedUser,
    task_id: web::Path<Uuid>,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, AppError> {
    let body = body.into_inner();
    ensure_allowed_keys(&body, TASK_PATCH_FIELDS)?;

    let patch: TaskPatch = serde_json::from_value(Value::Object(body))
        .map_err(|e| AppError::BadRequest(format!("Invalid task properties: {}", e)))?;
    patch.validate()?;

    let task_uuid = task_id.into_inner();

    if patch.is_empty() {
        // Nothing to change; still 404 for a task the caller does not own.
        return get_owned(&pool, auth.user.id, task_uuid).await;
    }

    let mut sql = String::from("UPDATE tasks SET updated_at = now()");
    let mut param_count = 1;
    if patch.description.is_some() {
        sql.push_str(&format!(", description = ${}", param_count));
        param_count += 1;
    }
    if patch.completed.is_some() {
        sql.push_str(&format!(", completed = ${}", param_count));
        param_count += 1;
    }
    sql.push_str(&format!(
        " WHERE id = ${} AND owner = ${} RETURNING id, description, completed, owner, created_at, updated_at",
        param_count,
        param_count + 1
    ));

    let mut query = sqlx::query_as::<_, Task>(&sql);
    if let Some(description) = &patch.description {
        query = query.bind(description);
    }
    if let Some(completed) = patch.completed {
        query = query.bind(completed);
    }

    let task = query
        .bind(task_uuid)
        .bind(auth.user.id)
        .fetch_optional(&**pool)
        .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Deletes one of the caller's tasks and returns the removed record.
#[delete("/tasks/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    auth: AuthedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = sqlx::query_as::<_, Task>(
        "DELETE FROM tasks WHERE id = $1 AND owner = $2 \
         RETURNING id, description, completed, owner, created_at, updated_at",
    )
    .bind(task_id.into_inner())
    .bind(auth.user.id)
    .fetch_optional(&**pool)
    .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

async fn get_owned(
    pool: &PgPool,
    owner: i32,
    task_id: Uuid,
) -> Result<HttpResponse, AppError> {
    let task = sqlx::query_as::<_, Task>(
        "SELECT id, description, completed, owner, created_at, updated_at \
         FROM tasks WHERE id = $1 AND owner = $2",
    )
    .bind(task_id)
    .bind(owner)
    .fetch_optional(pool)
    .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}
