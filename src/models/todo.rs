use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Wire and storage format of a due date.
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Days added to the creation date when no due date is supplied.
pub const DEFAULT_DUE_IN_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub user_id: String,
    pub todo_id: String,
    pub created_at: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    pub due_date: String,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("invalid dueDate '{0}': expected YYYY-MM-DD")]
    InvalidDueDate(String),
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub name: String,
    pub due_date: Option<NaiveDate>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

/// The mutable fields of an item; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub name: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub done: Option<bool>,
}

impl TodoPatch {
    pub fn due_date_string(&self) -> Option<String> {
        self.due_date.map(format_due_date)
    }
}

impl CreateTodoRequest {
    pub fn validate(self) -> Result<NewTodo, ValidationError> {
        let name = validate_name(&self.name)?;
        let due_date = non_blank(self.due_date)
            .map(|raw| parse_due_date(&raw))
            .transpose()?;

        Ok(NewTodo {
            name,
            due_date,
            latitude: non_blank(self.latitude),
            longitude: non_blank(self.longitude),
        })
    }
}

impl UpdateTodoRequest {
    pub fn validate(self) -> Result<TodoPatch, ValidationError> {
        let name = self.name.as_deref().map(validate_name).transpose()?;
        let due_date = self
            .due_date
            .as_deref()
            .map(parse_due_date)
            .transpose()?;

        Ok(TodoPatch {
            name,
            due_date,
            done: self.done,
        })
    }
}

impl NewTodo {
    /// Builds the stored item for `user_id`, generating its id and timestamps.
    pub fn into_item(self, user_id: &str, now: DateTime<Utc>) -> TodoItem {
        let due_date = self
            .due_date
            .unwrap_or_else(|| default_due_date(now.date_naive()));

        TodoItem {
            user_id: user_id.to_string(),
            todo_id: Uuid::new_v4().to_string(),
            created_at: now.to_rfc3339(),
            name: self.name,
            latitude: self.latitude,
            longitude: self.longitude,
            due_date: format_due_date(due_date),
            done: false,
            attachment_url: None,
        }
    }
}

pub fn default_due_date(today: NaiveDate) -> NaiveDate {
    today + Duration::days(DEFAULT_DUE_IN_DAYS)
}

pub fn format_due_date(date: NaiveDate) -> String {
    date.format(DUE_DATE_FORMAT).to_string()
}

/// Accepts a plain date or a full RFC 3339 timestamp.
pub fn parse_due_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DUE_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.date_naive()))
        .map_err(|_| ValidationError::InvalidDueDate(raw.to_string()))
}

fn validate_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(name.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-28T10:15:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_create_defaults_due_date_to_a_week_out() {
        let req = CreateTodoRequest {
            name: "Paris".to_string(),
            latitude: Some("48.85".to_string()),
            longitude: Some("2.35".to_string()),
            ..Default::default()
        };

        let item = req.validate().unwrap().into_item("user-1", fixed_now());

        assert_eq!(item.due_date, "2024-04-04");
        assert_eq!(item.user_id, "user-1");
        assert!(!item.done);
        assert!(!item.todo_id.is_empty());
        assert_eq!(item.latitude.as_deref(), Some("48.85"));
        assert!(item.attachment_url.is_none());
    }

    #[test]
    fn test_create_keeps_supplied_due_date() {
        let req = CreateTodoRequest {
            name: "Kyoto".to_string(),
            due_date: Some("2025-11-02".to_string()),
            ..Default::default()
        };

        let item = req.validate().unwrap().into_item("user-1", fixed_now());
        assert_eq!(item.due_date, "2025-11-02");
    }

    #[test]
    fn test_create_accepts_timestamp_due_date() {
        let req = CreateTodoRequest {
            name: "Lima".to_string(),
            due_date: Some("2025-01-15T08:00:00.000Z".to_string()),
            ..Default::default()
        };

        let new_todo = req.validate().unwrap();
        assert_eq!(
            new_todo.due_date,
            Some(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap())
        );
    }

    #[test]
    fn test_create_rejects_blank_name() {
        let req = CreateTodoRequest {
            name: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(req.validate(), Err(ValidationError::EmptyName));
    }

    #[test]
    fn test_create_rejects_garbage_due_date() {
        let req = CreateTodoRequest {
            name: "Oslo".to_string(),
            due_date: Some("next tuesday".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            req.validate(),
            Err(ValidationError::InvalidDueDate(_))
        ));
    }

    #[test]
    fn test_create_drops_empty_coordinates() {
        let req = CreateTodoRequest {
            name: "Somewhere".to_string(),
            latitude: Some(String::new()),
            longitude: Some(" ".to_string()),
            ..Default::default()
        };

        let new_todo = req.validate().unwrap();
        assert_eq!(new_todo.latitude, None);
        assert_eq!(new_todo.longitude, None);
    }

    #[test]
    fn test_item_serializes_camel_case_and_omits_missing_fields() {
        let item = CreateTodoRequest {
            name: "Rome".to_string(),
            ..Default::default()
        }
        .validate()
        .unwrap()
        .into_item("user-1", fixed_now());

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["dueDate"], "2024-04-04");
        assert_eq!(json["done"], false);
        assert!(json.get("attachmentUrl").is_none());
        assert!(json.get("latitude").is_none());
    }

    #[test]
    fn test_update_validates_only_supplied_fields() {
        let patch = UpdateTodoRequest {
            done: Some(true),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_eq!(
            patch,
            TodoPatch {
                done: Some(true),
                ..Default::default()
            }
        );

        let err = UpdateTodoRequest {
            name: Some(String::new()),
            ..Default::default()
        }
        .validate();
        assert_eq!(err, Err(ValidationError::EmptyName));
    }
}
