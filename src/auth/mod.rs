pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::models::User;
use crate::store::Store;

// Re-export necessary items
pub use extractors::AuthenticatedUser;
pub use middleware::{AuthMiddleware, AUTH_HEADER};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenManager};

/// Payload for changing the caller's password.
#[derive(Debug, Deserialize, Validate)]
pub struct PasswordChangeRequest {
    /// The new password. Must be at least 6 characters long.
    #[validate(length(min = 6))]
    pub password: String,
}

/// Looks a user up by email and checks the password against the stored hash.
///
/// An unknown email and a wrong password fail the same way, so callers cannot tell
/// which accounts exist.
pub async fn find_by_credentials(
    store: &dyn Store,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = match store.find_user_by_email(email.trim()).await? {
        Some(user) => user,
        None => return Err(AppError::BadRequest("Invalid credentials".into())),
    };

    let matches =
        password::verify_password_blocking(password.to_string(), user.password_hash.clone())
            .await?;
    if matches {
        Ok(user)
    } else {
        Err(AppError::BadRequest("Invalid credentials".into()))
    }
}
