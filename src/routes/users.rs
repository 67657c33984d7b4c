use crate::{
    auth::{
        hash_password, session, verify_password, AuthResponse, AuthedUser, LoginRequest,
    },
    avatar,
    config::Config,
    error::AppError,
    models::{ensure_allowed_keys, User, UserInput, UserPatch},
    models::user::USER_PATCH_FIELDS,
};
use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use futures::StreamExt;
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use validator::Validate;

/// Create a user account.
///
/// Validates the registration payload, enforces email uniqueness, hashes the
/// password, and immediately opens a first session so the client gets a
/// `{user, token}` pair back.
///
/// ## Responses:
/// - `201 Created`: the sanitized user record plus a session token.
/// - `400 Bad Request`: validation failure or duplicate email.
#[post("/users")]
pub async fn register(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    input: web::Json<UserInput>,
) -> Result<impl Responder, AppError> {
    input.validate()?;

    let name = input.name.trim().to_string();
    let email = input.email.trim().to_string();

    // Check if email already exists
    let existing_user = sqlx::query_as::<_, (i32,)>("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&**pool)
        .await?;

    if existing_user.is_some() {
        return Err(AppError::ValidationError("Email already registered".into()));
    }

    let password_hash = hash_password(&input.password)?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (name, email, age, password_hash) VALUES ($1, $2, $3, $4) \
         RETURNING id, name, email, age, created_at, updated_at",
    )
    .bind(&name)
    .bind(&email)
    .bind(input.age)
    .bind(&password_hash)
    .fetch_one(&**pool)
    .await?;

    let token = session::issue(&pool, config.jwt_secret.as_bytes(), user.id).await?;

    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Log a user in, minting a new session token for this device.
///
/// Unknown email and wrong password answer identically ("Unable to login"),
/// so a caller cannot probe which part was wrong.
#[post("/users/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    credentials: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    credentials.validate()?;

    let record = sqlx::query_as::<_, (i32, String)>(
        "SELECT id, password_hash FROM users WHERE email = $1",
    )
    .bind(credentials.email.trim())
    .fetch_optional(&**pool)
    .await?;

    let (user_id, password_hash) = match record {
        Some(record) => record,
        None => return Err(AppError::BadRequest("Unable to login".into())),
    };

    if !verify_password(&credentials.password, &password_hash)? {
        return Err(AppError::BadRequest("Unable to login".into()));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, age, created_at, updated_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_one(&**pool)
    .await?;

    let token = session::issue(&pool, config.jwt_secret.as_bytes(), user.id).await?;

    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

/// Return the caller's own sanitized record.
#[get("/users/me")]
pub async fn me(auth: AuthedUser) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(auth.user))
}

/// Update a subset of the caller's profile fields.
///
/// The body may only name `name`, `email`, `password`, and `age`; any other
/// key fails the whole patch with "Invalid Update" before anything is
/// touched. A changed password is re-hashed; a changed email must still be
/// unique.
#[patch("/users/me")]
pub async fn update_me(
    pool: web::Data<PgPool>,
    auth: AuthedUser,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, AppError> {
    let body = body.into_inner();
    ensure_allowed_keys(&body, USER_PATCH_FIELDS)?;

    let patch: UserPatch = serde_json::from_value(Value::Object(body))
        .map_err(|e| AppError::BadRequest(format!("Invalid user properties: {}", e)))?;
    patch.validate()?;

    if patch.is_empty() {
        return Ok(HttpResponse::Ok().json(auth.user));
    }

    if let Some(email) = &patch.email {
        let taken = sqlx::query_as::<_, (i32,)>(
            "SELECT id FROM users WHERE email = $1 AND id <> $2",
        )
        .bind(email.trim())
        .bind(auth.user.id)
        .fetch_optional(&**pool)
        .await?;
        if taken.is_some() {
            return Err(AppError::ValidationError("Email already registered".into()));
        }
    }

    // Hash the raw password at the boundary; only the hash is ever bound.
    let password_hash = match &patch.password {
        Some(raw) => Some(hash_password(raw)?),
        None => None,
    };

    // Only the supplied columns are updated, in declaration order; binds
    // below follow the same order.
    let mut sql = String::from("UPDATE users SET updated_at = now()");
    let mut param_count = 1;
    if patch.name.is_some() {
        sql.push_str(&format!(", name = ${}", param_count));
        param_count += 1;
    }
    if patch.email.is_some() {
        sql.push_str(&format!(", email = ${}", param_count));
        param_count += 1;
    }
    if password_hash.is_some() {
        sql.push_str(&format!(", password_hash = ${}", param_count));
        param_count += 1;
    }
    if patch.age.is_some() {
        sql.push_str(&format!(", age = ${}", param_count));
        param_count += 1;
    }
    sql.push_str(&format!(
        " WHERE id = ${} RETURNING id, name, email, age, created_at, updated_at",
        param_count
    ));

    let mut query = sqlx::query_as::<_, User>(&sql);
    if let Some(name) = &patch.name {
        query = query.bind(name.trim().to_string());
    }
    if let Some(email) = &patch.email {
        query = query.bind(email.trim().to_string());
    }
    if let Some(hash) = password_hash {
        query = query.bind(hash);
    }
    if let Some(age) = patch.age {
        query = query.bind(age);
    }

    let user = query.bind(auth.user.id).fetch_one(&**pool).await?;

    Ok(HttpResponse::Ok().json(user))
}

/// Delete the caller's account, cascading to everything it owns.
///
/// Tasks, sessions, and the user row are removed inside one transaction:
/// either the account and all its dependents are gone, or nothing is. The
/// cascade is explicit orchestration here, not a database-level hook.
#[delete("/users/me")]
pub async fn delete_me(
    pool: web::Data<PgPool>,
    auth: AuthedUser,
) -> Result<impl Responder, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM tasks WHERE owner = $1")
        .bind(auth.user.id)
        .execute(&mut *tx)
        .await?;
    // Deleting the sessions revokes every outstanding token for the account.
    sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(auth.user.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(auth.user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    log::info!("Deleted user {} and all owned tasks", auth.user.id);

    Ok(HttpResponse::Ok().json(auth.user))
}

/// Revoke the session token presented in this request.
///
/// Other devices' tokens stay valid.
#[post("/users/logout")]
pub async fn logout(
    pool: web::Data<PgPool>,
    auth: AuthedUser,
) -> Result<impl Responder, AppError> {
    session::revoke(&pool, auth.user.id, &auth.token).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "You are logged out" })))
}

/// Revoke every session token the caller holds.
#[post("/users/logoutAll")]
pub async fn logout_all(
    pool: web::Data<PgPool>,
    auth: AuthedUser,
) -> Result<impl Responder, AppError> {
    session::revoke_all(&pool, auth.user.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "You've been logged out from all devices successfully"
    })))
}

/// Upload the caller's avatar.
///
/// Expects a multipart field named `avatar` with a jpg/jpeg/png filename and
/// at most 1MB of data. The image is normalized to a 250x250 PNG before it
/// is stored, regardless of input format or dimensions.
#[post("/users/me/avatar")]
pub async fn upload_avatar(
    pool: web::Data<PgPool>,
    auth: AuthedUser,
    mut payload: Multipart,
) -> Result<impl Responder, AppError> {
    let mut upload: Option<Vec<u8>> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::BadRequest(e.to_string()))?;
        if field.name() != "avatar" {
            continue;
        }

        let filename_ok = field
            .content_disposition()
            .get_filename()
            .map(avatar::has_allowed_extension)
            .unwrap_or(false);
        if !filename_ok {
            return Err(AppError::BadRequest(
                "Please provide a jpg, jpeg or png file".into(),
            ));
        }

        let mut buffer = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
            if buffer.len() + chunk.len() > avatar::MAX_UPLOAD_BYTES {
                return Err(AppError::BadRequest(
                    "Image exceeds the 1MB upload limit".into(),
                ));
            }
            buffer.extend_from_slice(&chunk);
        }
        upload = Some(buffer);
    }

    let bytes = upload.ok_or_else(|| AppError::BadRequest("Missing 'avatar' upload field".into()))?;
    let png = avatar::normalize(&bytes)?;

    sqlx::query("UPDATE users SET avatar = $1, updated_at = now() WHERE id = $2")
        .bind(png)
        .bind(auth.user.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().finish())
}

/// Serve a user's avatar as PNG bytes.
///
/// Public by design (avatars are displayed to other users); a user without a
/// stored avatar is a plain 404.
#[get("/users/{id}/avatar")]
pub async fn get_avatar(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let row = sqlx::query_as::<_, (Option<Vec<u8>>,)>("SELECT avatar FROM users WHERE id = $1")
        .bind(user_id.into_inner())
        .fetch_optional(&**pool)
        .await?;

    match row {
        Some((Some(bytes),)) => Ok(HttpResponse::Ok().content_type("image/png").body(bytes)),
        _ => Err(AppError::NotFound("Avatar not found".into())),
    }
}

/// Clear the caller's stored avatar.
#[delete("/users/me/avatar")]
pub async fn delete_avatar(
    pool: web::Data<PgPool>,
    auth: AuthedUser,
) -> Result<impl Responder, AppError> {
    sqlx::query("UPDATE users SET avatar = NULL, updated_at = now() WHERE id = $1")
        .bind(auth.user.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Avatar has been deleted" })))
}
