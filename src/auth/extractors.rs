use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use sqlx::PgPool;

use crate::auth::session;
use crate::config::Config;
use crate::error::AppError;
use crate::models::User;

/// Extracts the authenticated caller from a request.
///
/// Runs the full session validation: Bearer header parsing, signature check,
/// and the session-store lookup that rejects revoked tokens. Handlers that
/// take an `AuthedUser` parameter are thereby auth-required; public handlers
/// simply don't take one, which lets public and protected routes share a path
/// prefix (`POST /users` vs `GET /users/me`).
///
/// The token string is kept alongside the user because single logout must
/// revoke exactly the session that made the request.
#[derive(Debug)]
pub struct AuthedUser {
    pub user: User,
    pub token: String,
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("Please Authenticate!".into())
}

impl FromRequest for AuthedUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let token = req
                .headers()
                .get("Authorization")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .ok_or_else(unauthorized)?
                .to_string();

            let pool = req
                .app_data::<web::Data<PgPool>>()
                .ok_or_else(|| AppError::InternalServerError("Database pool missing".into()))?;
            let config = req
                .app_data::<web::Data<Config>>()
                .ok_or_else(|| AppError::InternalServerError("Config missing".into()))?;

            // Whatever went wrong (bad signature, revoked session, deleted
            // user), the caller learns only that authentication failed.
            let user = session::validate(pool, config.jwt_secret.as_bytes(), &token)
                .await
                .map_err(|_| unauthorized())?;

            Ok(AuthedUser { user, token })
        })
    }
}
