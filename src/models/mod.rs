pub mod todo;

use serde::{Deserialize, Serialize};

pub use todo::{
    CreateTodoRequest, NewTodo, TodoItem, TodoPatch, UpdateTodoRequest, ValidationError,
    default_due_date, format_due_date,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoListResponse {
    pub items: Vec<TodoItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoResponse {
    pub item: TodoItem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
}
