use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A todo item owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier for the todo (UUID v4).
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
    /// Epoch milliseconds; only present while `completed` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    /// The owning user. All reads and writes are filtered on this.
    pub creator_id: Uuid,
}

impl Todo {
    /// Creates an incomplete todo for `creator_id` from already-validated input.
    pub fn new(input: TodoInput, creator_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: input.text,
            completed: false,
            completed_at: None,
            creator_id,
        }
    }

    /// Applies a partial update in place.
    ///
    /// Marking the todo completed stamps `completed_at` with the current time, even if it
    /// was already completed. Marking it incomplete clears the stamp.
    pub fn apply(&mut self, patch: TodoPatch) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        match patch.completed {
            Some(true) => {
                self.completed = true;
                self.completed_at = Some(Utc::now().timestamp_millis());
            }
            Some(false) => {
                self.completed = false;
                self.completed_at = None;
            }
            None => {}
        }
    }
}

/// Body of `POST /todos`.
#[derive(Debug, Deserialize, Validate)]
pub struct TodoInput {
    #[validate(length(min = 1))]
    pub text: String,
}

impl TodoInput {
    pub fn normalized(self) -> Self {
        Self {
            text: self.text.trim().to_string(),
        }
    }
}

/// Body of `PATCH /todos/{id}`. Absent fields are left untouched.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct TodoPatch {
    #[validate(length(min = 1))]
    pub text: Option<String>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn normalized(self) -> Self {
        Self {
            text: self.text.map(|t| t.trim().to_string()),
            completed: self.completed,
        }
    }
}
