use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::error::AppError;
use crate::models::{AuthToken, Todo, TodoPatch, User};

/// In-process store. Contents live as long as the value and are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    // insertion order doubles as listing order
    todos: Vec<Todo>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User, AppError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::BadRequest("Email already registered".into()));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .get(&user_id)
            .filter(|u| u.has_token(token))
            .cloned())
    }

    async fn set_password_hash(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn push_token(&self, user_id: Uuid, token: AuthToken) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        user.tokens.push(token);
        Ok(())
    }

    async fn remove_token(&self, user_id: Uuid, token: &AuthToken) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.tokens.retain(|t| t != token);
        }
        Ok(())
    }

    async fn insert_todo(&self, todo: Todo) -> Result<Todo, AppError> {
        let mut inner = self.inner.write().await;
        inner.todos.push(todo.clone());
        Ok(todo)
    }

    async fn list_todos(&self, creator_id: Uuid) -> Result<Vec<Todo>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .todos
            .iter()
            .filter(|t| t.creator_id == creator_id)
            .cloned()
            .collect())
    }

    async fn find_todo(&self, id: Uuid, creator_id: Uuid) -> Result<Option<Todo>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .todos
            .iter()
            .find(|t| t.id == id && t.creator_id == creator_id)
            .cloned())
    }

    async fn update_todo(
        &self,
        id: Uuid,
        creator_id: Uuid,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, AppError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .todos
            .iter_mut()
            .find(|t| t.id == id && t.creator_id == creator_id)
            .map(|todo| {
                todo.apply(patch);
                todo.clone()
            }))
    }

    async fn delete_todo(&self, id: Uuid, creator_id: Uuid) -> Result<Option<Todo>, AppError> {
        let mut inner = self.inner.write().await;
        let position = inner
            .todos
            .iter()
            .position(|t| t.id == id && t.creator_id == creator_id);
        Ok(position.map(|i| inner.todos.remove(i)))
    }

    async fn close(&self) {
        let mut inner = self.inner.write().await;
        inner.users.clear();
        inner.todos.clear();
    }
}
