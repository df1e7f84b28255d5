//! State of the todo list screen.
//!
//! The screen never mutates its state in place: every user action or server
//! reply is an [`Action`], and [`reduce`] turns the current snapshot into the
//! next one.

use chrono::NaiveDate;

use crate::models::{
    CreateTodoRequest, TodoItem, UpdateTodoRequest, default_due_date, format_due_date,
};

#[derive(Debug, Clone, PartialEq)]
pub struct TodosState {
    pub todos: Vec<TodoItem>,
    pub new_todo_name: String,
    pub latitude: String,
    pub longitude: String,
    pub loading: bool,
    /// Message shown as a blocking alert after a failed call.
    pub alert: Option<String>,
}

impl Default for TodosState {
    fn default() -> Self {
        Self {
            todos: Vec::new(),
            new_todo_name: String::new(),
            latitude: String::new(),
            longitude: String::new(),
            loading: true,
            alert: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Loaded(Vec<TodoItem>),
    LoadFailed(String),
    NameChanged(String),
    LatitudeChanged(String),
    LongitudeChanged(String),
    Created(TodoItem),
    CreateFailed,
    Deleted(String),
    DeleteFailed,
    Toggled(String),
    ToggleFailed,
    AlertDismissed,
}

pub fn reduce(state: &TodosState, action: Action) -> TodosState {
    let mut next = state.clone();
    match action {
        Action::Loaded(todos) => {
            next.todos = todos;
            next.loading = false;
        }
        Action::LoadFailed(message) => {
            next.alert = Some(format!("Failed to fetch todos: {}", message));
        }
        Action::NameChanged(name) => next.new_todo_name = name,
        Action::LatitudeChanged(lat) => next.latitude = lat,
        Action::LongitudeChanged(lng) => next.longitude = lng,
        Action::Created(item) => {
            next.todos.push(item);
            next.new_todo_name.clear();
        }
        Action::CreateFailed => next.alert = Some("Todo creation failed".to_string()),
        Action::Deleted(todo_id) => next.todos.retain(|t| t.todo_id != todo_id),
        Action::DeleteFailed => next.alert = Some("Todo deletion failed".to_string()),
        Action::Toggled(todo_id) => {
            if let Some(todo) = next.todos.iter_mut().find(|t| t.todo_id == todo_id) {
                todo.done = !todo.done;
            }
        }
        Action::ToggleFailed => next.alert = Some("Todo update failed".to_string()),
        Action::AlertDismissed => next.alert = None,
    }
    next
}

impl TodosState {
    /// The create call for the form as currently filled in.
    pub fn create_request(&self, today: NaiveDate) -> CreateTodoRequest {
        CreateTodoRequest {
            name: self.new_todo_name.clone(),
            due_date: Some(format_due_date(default_due_date(today))),
            latitude: Some(self.latitude.clone()),
            longitude: Some(self.longitude.clone()),
        }
    }

    /// The update call that flips completion of `todo_id`.
    pub fn toggle_request(&self, todo_id: &str) -> Option<UpdateTodoRequest> {
        self.todos
            .iter()
            .find(|t| t.todo_id == todo_id)
            .map(|todo| UpdateTodoRequest {
                name: Some(todo.name.clone()),
                due_date: Some(todo.due_date.clone()),
                done: Some(!todo.done),
            })
    }
}

/// Coordinates to center a map on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn parse(latitude: Option<&str>, longitude: Option<&str>) -> Option<Self> {
        let lat: f64 = latitude?.trim().parse().ok()?;
        let lng: f64 = longitude?.trim().parse().ok()?;

        // NaN fails both comparisons
        let in_range = lat > -90.0 && lat < 90.0 && lng > -180.0 && lng < 180.0;
        in_range.then_some(Self { lat, lng })
    }

    pub fn from_item(item: &TodoItem) -> Option<Self> {
        Self::parse(item.latitude.as_deref(), item.longitude.as_deref())
    }
}
