use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

use crate::models::{TodoItem, TodoPatch};

const COLUMNS: &str =
    "user_id, todo_id, created_at, name, latitude, longitude, due_date, done, attachment_url";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("todo {todo_id} not found")]
    NotFound { todo_id: String },

    #[error("todo {todo_id} already exists")]
    Conflict { todo_id: String },

    #[error("invalid table name '{0}'")]
    InvalidTable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    fn not_found(todo_id: &str) -> Self {
        Self::NotFound {
            todo_id: todo_id.to_string(),
        }
    }
}

/// Owner-scoped access to stored todo items.
///
/// Every lookup is keyed by `(user_id, todo_id)`, so an item owned by another
/// user is indistinguishable from a missing one.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    async fn list(&self, user_id: &str) -> Result<Vec<TodoItem>, RepositoryError>;
    async fn get(&self, user_id: &str, todo_id: &str) -> Result<TodoItem, RepositoryError>;
    async fn create(&self, item: TodoItem) -> Result<TodoItem, RepositoryError>;
    async fn update(
        &self,
        user_id: &str,
        todo_id: &str,
        patch: &TodoPatch,
    ) -> Result<(), RepositoryError>;
    async fn delete(&self, user_id: &str, todo_id: &str) -> Result<(), RepositoryError>;
    async fn set_attachment_url(
        &self,
        user_id: &str,
        todo_id: &str,
        url: &str,
    ) -> Result<(), RepositoryError>;
    async fn ping(&self) -> Result<(), RepositoryError>;
}

pub struct SqliteTodoRepository {
    db: SqlitePool,
    table: String,
}

impl SqliteTodoRepository {
    /// The table name is interpolated into SQL, so only plain identifiers are accepted.
    pub fn new(db: SqlitePool, table: &str) -> Result<Self, RepositoryError> {
        if !is_identifier(table) {
            return Err(RepositoryError::InvalidTable(table.to_string()));
        }
        Ok(Self {
            db,
            table: table.to_string(),
        })
    }

    pub async fn init_schema(&self) -> Result<(), RepositoryError> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                user_id TEXT NOT NULL,
                todo_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                name TEXT NOT NULL,
                latitude TEXT,
                longitude TEXT,
                due_date TEXT NOT NULL,
                done INTEGER NOT NULL DEFAULT 0,
                attachment_url TEXT,
                PRIMARY KEY (user_id, todo_id)
            )
            "#,
            self.table
        );
        sqlx::query(&sql).execute(&self.db).await?;
        debug!(table = %self.table, "todo table ready");
        Ok(())
    }
}

#[async_trait]
impl TodoRepository for SqliteTodoRepository {
    async fn list(&self, user_id: &str) -> Result<Vec<TodoItem>, RepositoryError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} WHERE user_id = ?1 ORDER BY created_at, rowid",
            self.table
        );
        let items = sqlx::query_as::<_, TodoItem>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        Ok(items)
    }

    async fn get(&self, user_id: &str, todo_id: &str) -> Result<TodoItem, RepositoryError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} WHERE user_id = ?1 AND todo_id = ?2",
            self.table
        );
        sqlx::query_as::<_, TodoItem>(&sql)
            .bind(user_id)
            .bind(todo_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::not_found(todo_id))
    }

    async fn create(&self, item: TodoItem) -> Result<TodoItem, RepositoryError> {
        let sql = format!(
            "INSERT INTO {} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            self.table
        );
        sqlx::query(&sql)
            .bind(&item.user_id)
            .bind(&item.todo_id)
            .bind(&item.created_at)
            .bind(&item.name)
            .bind(&item.latitude)
            .bind(&item.longitude)
            .bind(&item.due_date)
            .bind(item.done)
            .bind(&item.attachment_url)
            .execute(&self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    RepositoryError::Conflict {
                        todo_id: item.todo_id.clone(),
                    }
                }
                other => RepositoryError::Database(other),
            })?;

        Ok(item)
    }

    async fn update(
        &self,
        user_id: &str,
        todo_id: &str,
        patch: &TodoPatch,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            r#"
            UPDATE {}
            SET name = COALESCE(?1, name),
                due_date = COALESCE(?2, due_date),
                done = COALESCE(?3, done)
            WHERE user_id = ?4 AND todo_id = ?5
            "#,
            self.table
        );
        let affected = sqlx::query(&sql)
            .bind(&patch.name)
            .bind(patch.due_date_string())
            .bind(patch.done)
            .bind(user_id)
            .bind(todo_id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(RepositoryError::not_found(todo_id));
        }
        Ok(())
    }

    async fn delete(&self, user_id: &str, todo_id: &str) -> Result<(), RepositoryError> {
        let sql = format!(
            "DELETE FROM {} WHERE user_id = ?1 AND todo_id = ?2",
            self.table
        );
        let affected = sqlx::query(&sql)
            .bind(user_id)
            .bind(todo_id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(RepositoryError::not_found(todo_id));
        }
        Ok(())
    }

    async fn set_attachment_url(
        &self,
        user_id: &str,
        todo_id: &str,
        url: &str,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            "UPDATE {} SET attachment_url = ?1 WHERE user_id = ?2 AND todo_id = ?3",
            self.table
        );
        let affected = sqlx::query(&sql)
            .bind(url)
            .bind(user_id)
            .bind(todo_id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(RepositoryError::not_found(todo_id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("select 1").execute(&self.db).await?;
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
