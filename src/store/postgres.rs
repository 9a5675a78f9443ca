use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use super::Store;
use crate::error::AppError;
use crate::models::{AuthToken, Todo, TodoPatch, User, AUTH_ACCESS};

const TODO_COLUMNS: &str = "id, text, completed, completed_at, creator_id";

/// PostgreSQL-backed store. Session tokens live in `user_tokens`, one row per token.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
}

impl PgStore {
    /// Connects and applies pending migrations from `migrations/`.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    async fn with_tokens(&self, row: UserRow) -> Result<User, AppError> {
        let tokens = sqlx::query_as::<_, (String, String)>(
            "SELECT access, token FROM user_tokens WHERE user_id = $1 ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(access, token)| AuthToken { access, token })
        .collect();

        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            tokens,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: User) -> Result<User, AppError> {
        sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)")
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.with_tokens(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_user_by_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT u.id, u.email, u.password_hash FROM users u \
             WHERE u.id = $1 AND EXISTS ( \
                 SELECT 1 FROM user_tokens t \
                 WHERE t.user_id = u.id AND t.token = $2 AND t.access = $3)",
        )
        .bind(user_id)
        .bind(token)
        .bind(AUTH_ACCESS)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.with_tokens(row).await?)),
            None => Ok(None),
        }
    }

    async fn set_password_hash(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }

    async fn push_token(&self, user_id: Uuid, token: AuthToken) -> Result<(), AppError> {
        let result = sqlx::query(
            "INSERT INTO user_tokens (user_id, access, token) \
             SELECT $1, $2, $3 WHERE EXISTS (SELECT 1 FROM users WHERE id = $1)",
        )
        .bind(user_id)
        .bind(&token.access)
        .bind(&token.token)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }

    async fn remove_token(&self, user_id: Uuid, token: &AuthToken) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_tokens WHERE user_id = $1 AND access = $2 AND token = $3")
            .bind(user_id)
            .bind(&token.access)
            .bind(&token.token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_todo(&self, todo: Todo) -> Result<Todo, AppError> {
        let sql = format!(
            "INSERT INTO todos ({cols}) VALUES ($1, $2, $3, $4, $5) RETURNING {cols}",
            cols = TODO_COLUMNS
        );
        let todo = sqlx::query_as::<_, Todo>(&sql)
            .bind(todo.id)
            .bind(todo.text)
            .bind(todo.completed)
            .bind(todo.completed_at)
            .bind(todo.creator_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(todo)
    }

    async fn list_todos(&self, creator_id: Uuid) -> Result<Vec<Todo>, AppError> {
        let sql = format!(
            "SELECT {} FROM todos WHERE creator_id = $1 ORDER BY created_at, id",
            TODO_COLUMNS
        );
        let todos = sqlx::query_as::<_, Todo>(&sql)
            .bind(creator_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(todos)
    }

    async fn find_todo(&self, id: Uuid, creator_id: Uuid) -> Result<Option<Todo>, AppError> {
        let sql = format!(
            "SELECT {} FROM todos WHERE id = $1 AND creator_id = $2",
            TODO_COLUMNS
        );
        let todo = sqlx::query_as::<_, Todo>(&sql)
            .bind(id)
            .bind(creator_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(todo)
    }

    async fn update_todo(
        &self,
        id: Uuid,
        creator_id: Uuid,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, AppError> {
        // $4 drives both the flag and the stamp: NULL keeps them, true restamps, false clears.
        let sql = format!(
            "UPDATE todos SET \
                 text = COALESCE($3, text), \
                 completed = COALESCE($4, completed), \
                 completed_at = CASE \
                     WHEN $4::BOOLEAN IS NULL THEN completed_at \
                     WHEN $4::BOOLEAN THEN $5 \
                     ELSE NULL END \
             WHERE id = $1 AND creator_id = $2 \
             RETURNING {}",
            TODO_COLUMNS
        );
        let todo = sqlx::query_as::<_, Todo>(&sql)
            .bind(id)
            .bind(creator_id)
            .bind(patch.text)
            .bind(patch.completed)
            .bind(Utc::now().timestamp_millis())
            .fetch_optional(&self.pool)
            .await?;
        Ok(todo)
    }

    async fn delete_todo(&self, id: Uuid, creator_id: Uuid) -> Result<Option<Todo>, AppError> {
        let sql = format!(
            "DELETE FROM todos WHERE id = $1 AND creator_id = $2 RETURNING {}",
            TODO_COLUMNS
        );
        let todo = sqlx::query_as::<_, Todo>(&sql)
            .bind(id)
            .bind(creator_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(todo)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TodoInput;
    use std::env;

    // Needs a reachable database.
    #[ignore]
    #[actix_rt::test]
    async fn test_pg_store_round_trip() {
        dotenv::dotenv().ok();
        let store = PgStore::connect(&env::var("DATABASE_URL").expect("DATABASE_URL not set"))
            .await
            .unwrap();

        let email = format!("pg-{}@example.com", Uuid::new_v4());
        let user = store
            .insert_user(User::new(email.clone(), "hash".into()))
            .await
            .unwrap();
        assert!(matches!(
            store.insert_user(User::new(email.clone(), "hash".into())).await,
            Err(AppError::BadRequest(_))
        ));

        store.push_token(user.id, AuthToken::auth("tok")).await.unwrap();
        let found = store.find_user_by_token(user.id, "tok").await.unwrap().unwrap();
        assert_eq!(found.tokens, vec![AuthToken::auth("tok")]);
        store.remove_token(user.id, &AuthToken::auth("tok")).await.unwrap();
        assert!(store.find_user_by_token(user.id, "tok").await.unwrap().is_none());

        let todo = store
            .insert_todo(Todo::new(TodoInput { text: "pg".into() }, user.id))
            .await
            .unwrap();
        let done = store
            .update_todo(
                todo.id,
                user.id,
                TodoPatch {
                    text: None,
                    completed: Some(true),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(done.completed && done.completed_at.is_some());
        assert!(store.find_todo(todo.id, Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.delete_todo(todo.id, user.id).await.unwrap().is_some());

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user.id)
            .execute(&store.pool)
            .await
            .unwrap();
        store.close().await;
    }
}
