//! Persistence for users, their session tokens, and todos.
//!
//! Handlers never talk to a database directly: they receive an `Arc<dyn Store>` through
//! `AppState`. Two backends exist, `PgStore` for PostgreSQL and `MemoryStore` for tests
//! and throwaway local runs. `connect` picks one from the configured URL.
//!
//! Every todo operation takes the caller's id and filters on it. A todo owned by someone
//! else behaves exactly like a todo that does not exist.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::MEMORY_STORE_URL;
use crate::error::AppError;
use crate::models::{AuthToken, Todo, TodoPatch, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Persists a new user. Fails with `BadRequest` if the email is taken.
    async fn insert_user(&self, user: User) -> Result<User, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Returns the user only if `token` is in its token list with `auth` access.
    async fn find_user_by_token(&self, user_id: Uuid, token: &str)
        -> Result<Option<User>, AppError>;

    async fn set_password_hash(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError>;

    /// Appends a token to the user's list. Fails with `NotFound` for an unknown user.
    async fn push_token(&self, user_id: Uuid, token: AuthToken) -> Result<(), AppError>;

    /// Removes every entry equal to `token` from the user's list.
    async fn remove_token(&self, user_id: Uuid, token: &AuthToken) -> Result<(), AppError>;

    async fn insert_todo(&self, todo: Todo) -> Result<Todo, AppError>;

    async fn list_todos(&self, creator_id: Uuid) -> Result<Vec<Todo>, AppError>;

    async fn find_todo(&self, id: Uuid, creator_id: Uuid) -> Result<Option<Todo>, AppError>;

    async fn update_todo(
        &self,
        id: Uuid,
        creator_id: Uuid,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, AppError>;

    /// Deletes and returns the todo, if the caller owns it.
    async fn delete_todo(&self, id: Uuid, creator_id: Uuid) -> Result<Option<Todo>, AppError>;

    /// Releases backend resources. The store must not be used afterwards.
    async fn close(&self);
}

/// Opens the store named by `database_url`.
///
/// `memory` yields an empty `MemoryStore`; anything else is treated as a Postgres URL
/// and has pending migrations applied before it is returned.
pub async fn connect(database_url: &str) -> Result<Arc<dyn Store>, AppError> {
    if database_url == MEMORY_STORE_URL {
        log::info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = PgStore::connect(database_url).await?;
    log::info!("Connected to PostgreSQL store");
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn test_connect_memory() {
        let store = connect(MEMORY_STORE_URL).await.unwrap();
        let user = store
            .insert_user(User::new("a@example.com".into(), "hash".into()))
            .await
            .unwrap();
        assert!(store.find_user_by_email("a@example.com").await.unwrap().is_some());
        assert!(store.list_todos(user.id).await.unwrap().is_empty());
        store.close().await;
    }
}
