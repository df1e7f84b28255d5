//! HTTP client for the todo API, mirroring the calls the web frontend makes.

use reqwest::{Client, Response, Url};
use thiserror::Error;

use crate::error::ErrorResponse;
use crate::models::{
    CreateTodoRequest, TodoItem, TodoListResponse, TodoResponse, UpdateTodoRequest,
    UploadUrlResponse,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            ClientError::InvalidUrl(_) => None,
        }
    }
}

pub struct TodosClient {
    http: Client,
    base_url: Url,
    id_token: String,
}

impl TodosClient {
    pub fn new(base_url: &str, id_token: impl Into<String>) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url,
            id_token: id_token.into(),
        })
    }

    /// Appends percent-encoded path segments to the base url.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn list(&self) -> Result<Vec<TodoItem>, ClientError> {
        let resp = self
            .http
            .get(self.url(&["todos"]))
            .bearer_auth(&self.id_token)
            .send()
            .await?;
        let body: TodoListResponse = check(resp).await?.json().await?;
        Ok(body.items)
    }

    pub async fn get(&self, todo_id: &str) -> Result<TodoItem, ClientError> {
        let resp = self
            .http
            .get(self.url(&["todos", todo_id]))
            .bearer_auth(&self.id_token)
            .send()
            .await?;
        let body: TodoResponse = check(resp).await?.json().await?;
        Ok(body.item)
    }

    pub async fn create(&self, req: &CreateTodoRequest) -> Result<TodoItem, ClientError> {
        let resp = self
            .http
            .post(self.url(&["todos"]))
            .bearer_auth(&self.id_token)
            .json(req)
            .send()
            .await?;
        let body: TodoResponse = check(resp).await?.json().await?;
        Ok(body.item)
    }

    pub async fn update(
        &self,
        todo_id: &str,
        req: &UpdateTodoRequest,
    ) -> Result<(), ClientError> {
        let resp = self
            .http
            .patch(self.url(&["todos", todo_id]))
            .bearer_auth(&self.id_token)
            .json(req)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    pub async fn delete(&self, todo_id: &str) -> Result<(), ClientError> {
        let resp = self
            .http
            .delete(self.url(&["todos", todo_id]))
            .bearer_auth(&self.id_token)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    pub async fn upload_url(&self, todo_id: &str) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(self.url(&["todos", todo_id, "attachment"]))
            .bearer_auth(&self.id_token)
            .send()
            .await?;
        let body: UploadUrlResponse = check(resp).await?.json().await?;
        Ok(body.upload_url)
    }

    /// PUTs the file to a presigned URL. The store authorizes the request by
    /// its signature, so no bearer token is sent.
    pub async fn upload_attachment(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ClientError> {
        let resp = self.http.put(upload_url).body(bytes).send().await?;
        check(resp).await?;
        Ok(())
    }
}

async fn check(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|body| body.message)
        .unwrap_or(text);

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_ids_are_encoded_as_one_segment() {
        let client = TodosClient::new("http://localhost:3000/dev/", "token").unwrap();

        assert_eq!(
            client.url(&["todos"]).as_str(),
            "http://localhost:3000/dev/todos"
        );
        assert_eq!(
            client.url(&["todos", "a/b?c#d", "attachment"]).as_str(),
            "http://localhost:3000/dev/todos/a%2Fb%3Fc%23d/attachment"
        );
    }

    #[test]
    fn test_base_url_must_be_hierarchical() {
        assert!(matches!(
            TodosClient::new("not a url", "token"),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            TodosClient::new("mailto:someone@example.com", "token"),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
