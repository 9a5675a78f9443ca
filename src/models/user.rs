use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// The only access level a session token currently carries.
pub const AUTH_ACCESS: &str = "auth";

/// A session token stored with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access: String,
    pub token: String,
}

impl AuthToken {
    pub fn auth(token: impl Into<String>) -> Self {
        Self {
            access: AUTH_ACCESS.to_string(),
            token: token.into(),
        }
    }
}

/// A registered account.
///
/// Only `id` and `email` are ever serialized; the hash and the session tokens stay
/// server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub tokens: Vec<AuthToken>,
}

impl User {
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            tokens: Vec::new(),
        }
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.tokens
            .iter()
            .any(|t| t.access == AUTH_ACCESS && t.token == token)
    }
}

/// Email/password payload shared by registration and login.
#[derive(Debug, Deserialize, Validate)]
pub struct UserInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String, // plaintext, hashed before it reaches the store
}

impl UserInput {
    /// Trims the email; the password is taken as typed.
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_string(),
            password: self.password,
        }
    }
}
