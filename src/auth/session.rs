//! Session issue/validate/revoke over a server-side token set.
//!
//! Every login mints a signed JWT and records it in the `sessions` table.
//! Validation requires both a good signature and a live row, which makes
//! revocation immediate: logout deletes the row and the token is dead even
//! though its signature still verifies. The table is the allowlist and the
//! blocklist in one.
//!
//! Tokens carry no expiry on purpose; the session row is the sole source of
//! truth for liveness. The signing secret is injected by the caller (it comes
//! from `Config`), never read from the environment here.

use crate::error::AppError;
use crate::models::User;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's id.
    pub sub: i32,
    /// Issue timestamp (seconds since epoch).
    pub iat: i64,
    /// Random per-token id, so two logins in the same second still produce
    /// distinct tokens (the token string is the session primary key).
    pub jti: Uuid,
}

/// Signs a fresh session token for a user. Pure; does not touch the store.
pub fn sign_token(secret: &[u8], user_id: i32) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        iat: Utc::now().timestamp(),
        jti: Uuid::new_v4(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Verifies a token's signature and decodes its claims.
///
/// Expiry validation is disabled: these tokens have no `exp` claim, and
/// liveness is decided by the session store, not the clock.
pub fn decode_token(secret: &[u8], token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

/// Mints a token for `user_id` and records the session.
pub async fn issue(pool: &PgPool, secret: &[u8], user_id: i32) -> Result<String, AppError> {
    let token = sign_token(secret, user_id)?;
    sqlx::query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
        .bind(&token)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(token)
}

/// Resolves a presented token to its user.
///
/// Fails with 401 if the signature is bad, the claims are malformed, or no
/// live session row matches — a revoked token is indistinguishable from a
/// forged one.
pub async fn validate(pool: &PgPool, secret: &[u8], token: &str) -> Result<User, AppError> {
    let claims = decode_token(secret, token)?;
    let user = sqlx::query_as::<_, User>(
        "SELECT u.id, u.name, u.email, u.age, u.created_at, u.updated_at \
         FROM users u \
         JOIN sessions s ON s.user_id = u.id \
         WHERE s.token = $1 AND u.id = $2",
    )
    .bind(token)
    .bind(claims.sub)
    .fetch_optional(pool)
    .await?;

    user.ok_or_else(|| AppError::Unauthorized("Please Authenticate!".into()))
}

/// Revokes exactly one session ("logout" for the presenting device).
pub async fn revoke(pool: &PgPool, user_id: i32, token: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND token = $2")
        .bind(user_id)
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Revokes every session the user holds ("logout all devices").
pub async fn revoke_all(pool: &PgPool, user_id: i32) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_secret_for_sessions";

    #[test]
    fn test_token_round_trip() {
        let token = sign_token(SECRET, 42).unwrap();
        let claims = decode_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, 42);
    }

    #[test]
    fn test_tokens_are_unique_per_issue() {
        // Same user, same second: the random jti still separates them.
        let first = sign_token(SECRET, 7).unwrap();
        let second = sign_token(SECRET, 7).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = sign_token(SECRET, 1).unwrap();
        match decode_token(b"a_completely_different_secret", &token) {
            Err(AppError::Unauthorized(msg)) => {
                assert!(
                    msg.contains("InvalidSignature") || msg.contains("InvalidToken"),
                    "unexpected message: {}",
                    msg
                );
            }
            Ok(_) => panic!("Token should have been invalid due to signature mismatch"),
            Err(e) => panic!("Unexpected error type: {:?}", e),
        }
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(decode_token(SECRET, "not-a-jwt").is_err());
        assert!(decode_token(SECRET, "").is_err());
    }

    #[test]
    fn test_no_expiry_claim_required() {
        // Tokens deliberately carry no `exp`; decoding must not demand one.
        let token = sign_token(SECRET, 3).unwrap();
        assert!(decode_token(SECRET, &token).is_ok());
    }
}
