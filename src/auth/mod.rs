pub mod extractors;
pub mod password;
pub mod session;

use crate::models::User;
use serde::{Deserialize, Serialize};
use validator::Validate;

// Re-export necessary items
pub use extractors::AuthedUser;
pub use password::{hash_password, verify_password};
pub use session::{decode_token, sign_token, Claims};

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// User's email address.
    #[validate(email)]
    pub email: String,
    /// User's password.
    #[validate(length(min = 6))]
    pub password: String,
}

/// Response structure after successful authentication (registration or login).
///
/// Carries the sanitized user record and the freshly minted session token.
/// Each login mints a new token, so several devices can hold live sessions
/// for the same account at once.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}
