use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{Todo, TodoInput, TodoPatch},
    state::AppState,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

/// Parses a todo id from the path. A malformed id is reported as a missing todo.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Invalid id".into()))
}

/// Reads an optional PATCH body. An empty body is an empty patch.
fn parse_patch(body: &[u8]) -> Result<TodoPatch, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TodoPatch::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON: {}", e)))
}

fn not_found() -> AppError {
    AppError::NotFound("Todo not found".into())
}

/// Lists the caller's todos in creation order.
///
/// ## Responses:
/// - `200 OK`: `{"todos": [...]}`.
/// - `401 Unauthorized`: missing or invalid `x-auth`.
#[get("")]
pub async fn get_todos(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let todos = state.store.list_todos(caller.user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "todos": todos })))
}

/// Creates a todo owned by the caller.
///
/// ## Request Body:
/// - `text`: required, non-blank. Leading and trailing whitespace is dropped.
///
/// ## Responses:
/// - `200 OK`: the new todo, with `completed: false`.
/// - `400 Bad Request`: missing or blank `text`.
#[post("")]
pub async fn create_todo(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    input: web::Json<TodoInput>,
) -> Result<impl Responder, AppError> {
    let input = input.into_inner().normalized();
    input.validate()?;

    let todo = state
        .store
        .insert_todo(Todo::new(input, caller.user.id))
        .await?;
    Ok(HttpResponse::Ok().json(todo))
}

/// ## Responses:
/// - `200 OK`: `{"todo": ...}`.
/// - `404 Not Found`: malformed id, no such todo, or owned by someone else.
#[get("/{id}")]
pub async fn get_todo(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let id = parse_id(&id)?;
    let todo = state
        .store
        .find_todo(id, caller.user.id)
        .await?
        .ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(json!({ "todo": todo })))
}

/// Partially updates a todo.
///
/// `completed: true` stamps `completedAt` with the current epoch milliseconds,
/// `completed: false` clears it. Fields other than `text` and `completed` are ignored.
/// A missing body leaves the todo unchanged.
///
/// ## Responses:
/// - `200 OK`: `{"todo": ...}` after the update.
/// - `400 Bad Request`: blank `text`.
/// - `404 Not Found`: malformed id, no such todo, or owned by someone else.
#[patch("/{id}")]
pub async fn update_todo(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<String>,
    body: web::Bytes,
) -> Result<impl Responder, AppError> {
    let id = parse_id(&id)?;
    let patch = parse_patch(&body)?.normalized();
    patch.validate()?;

    let todo = state
        .store
        .update_todo(id, caller.user.id, patch)
        .await?
        .ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(json!({ "todo": todo })))
}

/// ## Responses:
/// - `200 OK`: `{"deletedTodo": ...}`.
/// - `404 Not Found`: malformed id, no such todo, or owned by someone else.
#[delete("/{id}")]
pub async fn delete_todo(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let id = parse_id(&id)?;
    let todo = state
        .store
        .delete_todo(id, caller.user.id)
        .await?
        .ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(json!({ "deletedTodo": todo })))
}
